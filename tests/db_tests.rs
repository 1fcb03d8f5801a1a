//! Source database tests: streaming, listing passes, watermark, retrieval, feed files.

use chrono::{TimeZone, Utc};
use rowfeed::engine::{DocAcl, RowStreamer, SourceDb};
use rowfeed::pipeline::{BatchSink, FeedDirSink, MemorySink, Retrieval};
use rowfeed::{DatabaseAdaptor, DocId, DocRecord, Error, PassSummary, Settings};
use rusqlite::Connection;
use rusqlite::types::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

const DOCS_SCHEMA: &str = r#"
CREATE TABLE docs (
    id INTEGER NOT NULL,
    name TEXT,
    body BLOB,
    action TEXT,
    CHANGE_TIMESTAMP TEXT
);
CREATE TABLE acl (
    id INTEGER NOT NULL,
    PERMIT_USERS TEXT,
    DENY_GROUPS TEXT
);
"#;

fn make_db(dir: &TempDir, rows: &[(i64, Option<&str>)]) -> PathBuf {
    let path = dir.path().join("source.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(DOCS_SCHEMA).unwrap();
    for (id, name) in rows {
        conn.execute(
            "INSERT INTO docs (id, name) VALUES (?1, ?2)",
            rusqlite::params![id, name],
        )
        .unwrap();
    }
    path
}

fn exec(path: &Path, sql: &str) {
    Connection::open(path).unwrap().execute_batch(sql).unwrap();
}

/// Settings with the given extra TOML appended to `[database]`/`[key]`/`[sql]`/`[mode]` defaults.
fn settings(db: &Path, key: &str, sql: &str, mode: &str, extra: &str) -> Settings {
    let text = format!(
        r#"
[database]
path = '{}'

[key]
{key}

[sql]
{sql}

[mode]
{mode}

{extra}
"#,
        db.display()
    );
    Settings::from_toml_str(&text).unwrap()
}

fn lister_settings(db: &Path, batch: usize) -> Settings {
    settings(
        db,
        r#"columns = "id, name""#,
        r#"every_doc_id = "SELECT id, name FROM docs ORDER BY id""#,
        r#"name = "lister""#,
        &format!("[feed]\nmax_ids_per_batch = {batch}"),
    )
}

fn adaptor(settings: &Settings, db: &Path) -> DatabaseAdaptor {
    DatabaseAdaptor::init(settings, SourceDb::new(db, None)).unwrap()
}

fn ids(sink: &MemorySink) -> Vec<String> {
    sink.records().map(|r| r.doc_id().to_string()).collect()
}

// --- row streamer ---

#[test]
fn test_streamer_preserves_result_order() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<_> = (1..=5).map(|i| (i, Some("n"))).collect();
    let db = make_db(&dir, &rows);
    for streaming in [true, false] {
        let streamer = RowStreamer::new(SourceDb::new(&db, None), streaming);
        let mut seen = Vec::new();
        let outcome = streamer
            .stream("SELECT id FROM docs ORDER BY id", rusqlite::params![], |row| {
                seen.push(row.values()[0].clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome.rows, 5);
        assert!(!outcome.cancelled);
        let expected: Vec<_> = (1..=5).map(Value::Integer).collect();
        assert_eq!(seen, expected);
    }
}

#[test]
fn test_streamer_binds_positional_params() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("a")), (2, Some("b"))]);
    let streamer = RowStreamer::new(SourceDb::new(&db, None), true);
    let row = streamer
        .first_row("SELECT name FROM docs WHERE id = ?", [2])
        .unwrap()
        .unwrap();
    assert_eq!(row.string("NAME").as_deref(), Some("b"));
    assert!(streamer.first_row("SELECT name FROM docs WHERE id = ?", [9]).unwrap().is_none());
}

#[test]
fn test_streamer_cancelled_before_start() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None)]);
    let cancel = Arc::new(AtomicBool::new(true));
    let streamer = RowStreamer::new(SourceDb::new(&db, None), true).with_cancel(cancel);
    let outcome = streamer
        .stream("SELECT id FROM docs", rusqlite::params![], |_| Ok(()))
        .unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.rows, 0);
}

#[test]
fn test_streamer_callback_error_stops_stream() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None), (3, None)]);
    let streamer = RowStreamer::new(SourceDb::new(&db, None), true);
    let mut calls = 0;
    let result = streamer.stream("SELECT id FROM docs", rusqlite::params![], |_| {
        calls += 1;
        Err(Error::delivery("stop", None))
    });
    assert!(matches!(result, Err(Error::Delivery { .. })));
    assert_eq!(calls, 1);
}

#[test]
fn test_streamer_bad_sql_is_source_error() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[]);
    let streamer = RowStreamer::new(SourceDb::new(&db, None), true);
    let result = streamer.stream("SELECT nope FROM missing", rusqlite::params![], |_| Ok(()));
    assert!(matches!(result, Err(Error::Source { .. })));
}

// --- full pass ---

#[test]
fn test_full_pass_infers_types_and_encodes_ids() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(5, Some("a/b")), (6, Some("x"))]);
    let a = adaptor(&lister_settings(&db, 100), &db);
    assert_eq!(a.schema().columns()[0].ty, rowfeed::ColumnType::Int);
    assert_eq!(a.schema().columns()[1].ty, rowfeed::ColumnType::String);

    let mut sink = MemorySink::default();
    let summary = a.full_pass(&mut sink).unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.batches, 1);
    assert_eq!(ids(&sink), ["5/a_/b", "6/x"]);
    assert!(sink.records().all(|r| !r.crawl_immediately()));
}

#[test]
fn test_full_pass_batch_boundaries() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<_> = (1..=4).map(|i| (i, Some("n"))).collect();
    let db = make_db(&dir, &rows);

    let mut sink = MemorySink::default();
    adaptor(&lister_settings(&db, 2), &db).full_pass(&mut sink).unwrap();
    let sizes: Vec<_> = sink.batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, [2, 2]);

    exec(&db, "INSERT INTO docs (id, name) VALUES (5, 'n');");
    let mut sink = MemorySink::default();
    let summary = adaptor(&lister_settings(&db, 2), &db).full_pass(&mut sink).unwrap();
    let sizes: Vec<_> = sink.batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, [2, 2, 1]);
    assert_eq!(summary.batches, 3);
}

#[test]
fn test_full_pass_skips_null_keys() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("a")), (2, None), (3, Some("c"))]);
    let mut sink = MemorySink::default();
    let summary = adaptor(&lister_settings(&db, 10), &db).full_pass(&mut sink).unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(ids(&sink), ["1/a", "3/c"]);
}

#[test]
fn test_full_pass_source_error_delivers_rows_already_read() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<_> = [(1, "a"), (2, "b"), (3, "c"), (4, "d")]
        .into_iter()
        .map(|(i, n)| (i, Some(n)))
        .collect();
    let db = make_db(&dir, &rows);
    // Row 3 overflows while the cursor steps onto it.
    let s = settings(
        &db,
        r#"columns = "id, name""#,
        r#"every_doc_id = "SELECT id, name, CASE WHEN id = 3 THEN abs(-9223372036854775807 - 1) ELSE 0 END AS boom FROM docs""#,
        r#"name = "lister""#,
        "[feed]\nmax_ids_per_batch = 10",
    );
    let mut sink = MemorySink::default();
    let err = adaptor(&s, &db).full_pass(&mut sink).unwrap_err();
    assert!(matches!(err, Error::Source { .. }), "{err}");
    assert_eq!(ids(&sink), ["1/a", "2/b"]);
}

#[test]
fn test_full_pass_action_column_marks_delete() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("a")), (2, Some("b"))]);
    exec(&db, "UPDATE docs SET action = 'DELETE' WHERE id = 2;");
    let s = settings(
        &db,
        r#"columns = "id""#,
        r#"every_doc_id = "SELECT id, action FROM docs ORDER BY id""#,
        r#"name = "lister""#,
        "[feed]\naction_column = \"action\"",
    );
    let mut sink = MemorySink::default();
    adaptor(&s, &db).full_pass(&mut sink).unwrap();
    let flags: Vec<_> = sink.records().map(DocRecord::delete_from_index).collect();
    assert_eq!(flags, [false, true]);
}

#[test]
fn test_url_and_metadata_lister_records_carry_metadata() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("http://example.com/1"))]);
    exec(&db, "UPDATE docs SET action = 'keep';");
    let s = settings(
        &db,
        "columns = \"name:string\"\ndoc_id_is_url = true",
        r#"every_doc_id = "SELECT name, action, id FROM docs""#,
        r#"name = "urlAndMetadataLister""#,
        "[metadata]\ncolumns = \"id:doc-number, action\"",
    );
    let a = adaptor(&s, &db);
    let mut sink = MemorySink::default();
    a.full_pass(&mut sink).unwrap();
    let record = sink.records().next().unwrap();
    assert_eq!(record.doc_id().as_str(), "http://example.com/1");
    assert_eq!(
        record.metadata(),
        [
            ("doc-number".to_string(), "1".to_string()),
            ("action".to_string(), "keep".to_string()),
        ]
    );
    assert!(matches!(
        a.fetch(record.doc_id()).unwrap(),
        Retrieval::NotFound
    ));
}

// --- incremental pass / watermark ---

fn incremental_settings(db: &Path, update_sql: &str) -> Settings {
    settings(
        db,
        r#"columns = "id""#,
        &format!("every_doc_id = \"SELECT id FROM docs\"\nupdate = \"{update_sql}\""),
        r#"name = "lister""#,
        "",
    )
}

#[test]
fn test_incremental_commits_max_change_timestamp() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None), (3, None)]);
    exec(
        &db,
        "UPDATE docs SET CHANGE_TIMESTAMP = '2024-01-01 00:00:01' WHERE id = 1;
         UPDATE docs SET CHANGE_TIMESTAMP = '2024-01-01 00:00:03' WHERE id = 2;
         UPDATE docs SET CHANGE_TIMESTAMP = '2024-01-01 00:00:02' WHERE id = 3;",
    );
    let s = incremental_settings(
        &db,
        "SELECT id, CHANGE_TIMESTAMP FROM docs WHERE CHANGE_TIMESTAMP > ? ORDER BY id",
    );
    let seed = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db).with_watermark(seed);

    let mut sink = MemorySink::default();
    let summary = a.incremental_pass(&mut sink).unwrap();
    assert_eq!(summary.records, 3);
    assert!(sink.records().all(DocRecord::crawl_immediately));
    let t3 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 3).unwrap();
    assert_eq!(a.watermark(), Some(t3));

    // Nothing newer: column present, no values, watermark stays.
    let mut sink = MemorySink::default();
    let summary = a.incremental_pass(&mut sink).unwrap();
    assert_eq!(summary.records, 0);
    assert_eq!(a.watermark(), Some(t3));
}

#[test]
fn test_incremental_without_change_column_moves_to_now() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None)]);
    let s = incremental_settings(&db, "SELECT id FROM docs WHERE ? IS NOT NULL");
    let seed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db).with_watermark(seed);
    let before = Utc::now();
    a.incremental_pass(MemorySink::default()).unwrap();
    assert!(a.watermark().unwrap() >= before);
}

#[test]
fn test_incremental_all_null_change_column_keeps_watermark() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None)]);
    let s = incremental_settings(
        &db,
        "SELECT id, CHANGE_TIMESTAMP FROM docs WHERE ? IS NOT NULL",
    );
    let seed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db).with_watermark(seed);
    let summary = a.incremental_pass(MemorySink::default()).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(a.watermark(), Some(seed));
}

#[test]
fn test_incremental_failed_pass_keeps_watermark() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None)]);
    exec(&db, "UPDATE docs SET CHANGE_TIMESTAMP = '2024-06-01 00:00:00';");
    let s = incremental_settings(
        &db,
        "SELECT id, CHANGE_TIMESTAMP FROM docs WHERE CHANGE_TIMESTAMP > ?",
    );
    let seed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db).with_watermark(seed);

    struct Refuse;
    impl BatchSink for Refuse {
        fn deliver(&mut self, _: &[DocRecord]) -> rowfeed::Result<()> {
            Err(Error::delivery("down", None))
        }
    }
    assert!(a.incremental_pass(Refuse).is_err());
    assert_eq!(a.watermark(), Some(seed));
}

/// Starts a second incremental pass from inside the first one's delivery.
struct NestedPassSink<'a> {
    adaptor: &'a DatabaseAdaptor,
    nested: Vec<rowfeed::Result<PassSummary>>,
    delivered: usize,
}

impl BatchSink for NestedPassSink<'_> {
    fn deliver(&mut self, batch: &[DocRecord]) -> rowfeed::Result<()> {
        self.delivered += batch.len();
        self.nested.push(self.adaptor.incremental_pass(MemorySink::default()));
        Ok(())
    }
}

#[test]
fn test_incremental_rejects_concurrent_pass() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, None), (2, None)]);
    exec(&db, "UPDATE docs SET CHANGE_TIMESTAMP = '2024-06-01 00:00:00';");
    let s = incremental_settings(
        &db,
        "SELECT id, CHANGE_TIMESTAMP FROM docs WHERE CHANGE_TIMESTAMP > ?",
    );
    let seed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db).with_watermark(seed);

    let mut sink = NestedPassSink {
        adaptor: &a,
        nested: Vec::new(),
        delivered: 0,
    };
    a.incremental_pass(&mut sink).unwrap();
    assert_eq!(sink.delivered, 2);
    assert_eq!(sink.nested.len(), 1);
    assert!(matches!(sink.nested[0], Err(Error::PassInProgress)));

    // The guard is released once the outer pass returns.
    let t = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    assert_eq!(a.watermark(), Some(t));
    assert!(a.incremental_pass(MemorySink::default()).is_ok());
}

/// Raises the cancel flag on its first delivery.
struct CancelOnDeliver {
    cancel: Arc<AtomicBool>,
    inner: MemorySink,
}

impl BatchSink for CancelOnDeliver {
    fn deliver(&mut self, batch: &[DocRecord]) -> rowfeed::Result<()> {
        self.cancel.store(true, Ordering::SeqCst);
        self.inner.deliver(batch)
    }
}

#[test]
fn test_incremental_cancelled_midway_keeps_watermark() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<_> = (1..=5).map(|i| (i, None)).collect();
    let db = make_db(&dir, &rows);
    exec(&db, "UPDATE docs SET CHANGE_TIMESTAMP = '2024-06-01 00:00:0' || id;");
    let s = settings(
        &db,
        r#"columns = "id""#,
        "every_doc_id = \"SELECT id FROM docs\"\nupdate = \"SELECT id, CHANGE_TIMESTAMP FROM docs WHERE CHANGE_TIMESTAMP > ? ORDER BY id\"",
        r#"name = "lister""#,
        "[feed]\nmax_ids_per_batch = 2",
    );
    let cancel = Arc::new(AtomicBool::new(false));
    let seed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let a = adaptor(&s, &db)
        .with_cancel(Arc::clone(&cancel))
        .with_watermark(seed);

    let mut sink = CancelOnDeliver {
        cancel,
        inner: MemorySink::default(),
    };
    let summary = a.incremental_pass(&mut sink).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(ids(&sink.inner), ["1", "2"]);
    assert_eq!(a.watermark(), Some(seed));
}

#[test]
fn test_incremental_needs_update_sql() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("a"))]);
    let a = adaptor(&lister_settings(&db, 10), &db);
    assert!(!a.supports_incremental());
    assert!(a.incremental_pass(MemorySink::default()).is_err());
}

// --- retrieval ---

fn content_settings(db: &Path, mode: &str, extra: &str) -> Settings {
    settings(
        db,
        "columns = \"id:int, name:string\"\ncontent_sql_columns = \"id\"\nacl_sql_columns = \"id\"",
        r#"every_doc_id = "SELECT id, name FROM docs"
single_doc_content = "SELECT id, name, body FROM docs WHERE id = ?"
acl = "SELECT PERMIT_USERS, DENY_GROUPS FROM acl WHERE id = ?""#,
        mode,
        extra,
    )
}

#[test]
fn test_fetch_row_to_text() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(5, Some("a/b"))]);
    let a = adaptor(&content_settings(&db, r#"name = "rowToText""#, ""), &db);
    let Retrieval::Found(doc) = a.fetch(&DocId::new("5/a_/b")).unwrap() else {
        panic!("expected document");
    };
    assert_eq!(doc.content_type, "text/plain; charset=utf-8");
    assert_eq!(doc.body.as_bytes(), b"id,name,body\n5,a/b,\n");
    assert!(doc.no_follow);
    assert_eq!(doc.acl, Some(DocAcl::Empty));
}

#[test]
fn test_fetch_missing_row_is_not_found() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(5, Some("a"))]);
    let a = adaptor(&content_settings(&db, r#"name = "rowToText""#, ""), &db);
    assert!(matches!(
        a.fetch(&DocId::new("6/a")).unwrap(),
        Retrieval::NotFound
    ));
}

#[test]
fn test_fetch_malformed_id_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(5, Some("a"))]);
    let a = adaptor(&content_settings(&db, r#"name = "rowToText""#, ""), &db);
    let err = a.fetch(&DocId::new("5/a/b")).unwrap_err();
    assert!(err.is_bad_request());
}

#[test]
fn test_fetch_blob_column_with_metadata_and_acl() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(5, Some("a"))]);
    exec(
        &db,
        "UPDATE docs SET body = X'00FF10' WHERE id = 5;
         INSERT INTO acl VALUES (5, 'alice,bob', NULL), (5, 'bob', 'contractors');",
    );
    let a = adaptor(
        &content_settings(
            &db,
            "name = \"blobColumn\"\ncolumn_name = \"body\"\ncontent_type_override = \"application/x-test\"",
            "[metadata]\ncolumns = \"name:title\"",
        ),
        &db,
    );
    let Retrieval::Found(doc) = a.fetch(&DocId::new("5/a")).unwrap() else {
        panic!("expected document");
    };
    assert_eq!(doc.content_type, "application/x-test");
    assert_eq!(doc.body.as_bytes(), [0x00, 0xFF, 0x10]);
    assert_eq!(doc.metadata, [("title".to_string(), "a".to_string())]);
    let Some(DocAcl::Principals(acl)) = doc.acl else {
        panic!("expected principals");
    };
    assert_eq!(acl.permit_users.len(), 2);
    assert_eq!(acl.deny_groups.len(), 1);

    assert!(matches!(
        a.acl(&DocId::new("5/a")).unwrap(),
        Some(DocAcl::Principals(_))
    ));
    assert_eq!(a.acl(&DocId::new("9/z")).unwrap(), Some(DocAcl::Empty));
}

// --- startup validation ---

#[test]
fn test_init_rejects_key_column_missing_from_query() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[]);
    let s = settings(
        &db,
        r#"columns = "id:int, missing:string""#,
        r#"every_doc_id = "SELECT id FROM docs""#,
        r#"name = "lister""#,
        "",
    );
    let err = DatabaseAdaptor::init(&s, SourceDb::new(&db, None)).err().unwrap();
    assert!(err.to_string().contains("[missing] not found in query sql.every_doc_id"));
}

#[test]
fn test_init_rejects_content_mode_without_content_sql() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[]);
    let s = settings(
        &db,
        r#"columns = "id""#,
        r#"every_doc_id = "SELECT id FROM docs""#,
        r#"name = "rowToText""#,
        "",
    );
    assert!(DatabaseAdaptor::init(&s, SourceDb::new(&db, None)).is_err());
}

#[test]
fn test_init_rejects_content_mode_with_url_ids() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("http://h/a"))]);
    let s = settings(
        &db,
        "columns = \"name:string\"\ndoc_id_is_url = true",
        r#"every_doc_id = "SELECT name FROM docs"
single_doc_content = "SELECT name, body FROM docs WHERE name = ?""#,
        r#"name = "rowToText""#,
        "",
    );
    let err = DatabaseAdaptor::init(&s, SourceDb::new(&db, None)).err().unwrap();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(err.to_string().contains("doc_id_is_url"));
}

#[test]
fn test_init_rejects_unresolvable_expression_key() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[]);
    let s = settings(
        &db,
        r#"columns = "n""#,
        r#"every_doc_id = "SELECT id + 1 AS n FROM docs""#,
        r#"name = "lister""#,
        "",
    );
    let err = DatabaseAdaptor::init(&s, SourceDb::new(&db, None)).err().unwrap();
    assert!(err.to_string().contains("Unknown column type for the following columns: [n]"));
}

// --- feed files ---

#[test]
fn test_feed_dir_sink_is_idempotent_per_batch() {
    let dir = TempDir::new().unwrap();
    let db = make_db(&dir, &[(1, Some("a")), (2, Some("b"))]);
    let out = dir.path().join("feeds");
    let a = adaptor(&lister_settings(&db, 10), &db);

    let mut sink = FeedDirSink::new(&out).unwrap();
    a.full_pass(&mut sink).unwrap();
    a.full_pass(&mut sink).unwrap();
    assert_eq!(sink.written().len(), 2);
    assert_eq!(sink.written()[0], sink.written()[1]);

    let files: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
    assert_eq!(files.len(), 1);
    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&sink.written()[0]).unwrap()).unwrap();
    assert_eq!(json[1]["doc_id"], "2/b");
}
