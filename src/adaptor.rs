//! Startup validation and wiring: settings → key schema, pipeline mode, passes and retrieval.

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::engine::acl::{AclColumns, AclResolver, DocAcl};
use crate::engine::content::ColumnOptions;
use crate::engine::db_ops::{RowStreamer, SourceDb, query_columns, verify_column_names};
use crate::engine::key_schema::{KeySchema, KeySchemaBuilder, ProjectionSources};
use crate::engine::metadata_columns::MetadataColumns;
use crate::engine::values::parse_offset;
use crate::error::{Error, Result};
use crate::pipeline::{
    BatchSink, IncrementalLister, PassInput, PipelineMode, RecordFactory, Retrieval,
    RetrievalContext, Watermark, full_pass,
};
use crate::utils::settings::{Settings, SqlSection};
use crate::{DocId, PassSummary};

/// A configured feeder for one database. Passes and retrievals may run from several threads;
/// each opens its own connection.
pub struct DatabaseAdaptor {
    schema: KeySchema,
    mode: PipelineMode,
    metadata: MetadataColumns,
    acl: AclResolver,
    sql: SqlSection,
    action_column: Option<String>,
    streamer: RowStreamer,
    incremental: Option<IncrementalLister>,
    change_column: String,
    batch_size: usize,
    zone: FixedOffset,
    verbose: bool,
}

impl DatabaseAdaptor {
    /// Validate `settings` against the database and build the adaptor.
    ///
    /// Key column types not declared in settings are read from the declared types of the
    /// configured queries, in order: every-doc-id, update, content, ACL, metadata.
    /// Queries are prepared, never executed.
    pub fn init(settings: &Settings, db: SourceDb) -> Result<Self> {
        let feed = &settings.feed;
        let sql = &settings.sql;
        if feed.max_ids_per_batch == 0 {
            return Err(Error::config("feed.max_ids_per_batch must be greater than 0"));
        }
        let zone = parse_offset(&feed.timestamp_offset).ok_or_else(|| {
            Error::config(format!(
                "feed.timestamp_offset '{}' is not an offset like +05:30",
                feed.timestamp_offset
            ))
        })?;
        if sql.every_doc_id.trim().is_empty() {
            return Err(Error::config("sql.every_doc_id cannot be empty"));
        }

        let key = &settings.key;
        let mut builder = KeySchemaBuilder::parse(&key.columns, key.doc_id_is_url)?
            .with_projections(ProjectionSources {
                content: ("key.content_sql_columns", &key.content_sql_columns),
                acl: ("key.acl_sql_columns", &key.acl_sql_columns),
                metadata: ("key.metadata_sql_columns", &key.metadata_sql_columns),
            })?;

        let mode_settings = &settings.mode;
        let mode = PipelineMode::from_name(
            &mode_settings.name,
            &ColumnOptions {
                column: mode_settings.column_name.clone(),
                content_type_override: mode_settings.content_type_override.clone(),
                content_type_col: mode_settings.content_type_col.clone(),
            },
            key.doc_id_is_url,
        )?;
        if mode.renderer().is_some() && sql.single_doc_content.trim().is_empty() {
            return Err(Error::config(format!(
                "mode '{}' requires sql.single_doc_content",
                mode_settings.name
            )));
        }

        let metadata = MetadataColumns::parse(&settings.metadata.columns)?
            .include_all_when_empty(settings.metadata.include_all_columns);

        for (sql_key, query) in named_queries(sql) {
            if builder.unresolved().is_empty() {
                break;
            }
            match query_columns(&db, query) {
                Ok(columns) => builder.add_column_types(&columns)?,
                Err(e) => warn!("Cannot inspect {sql_key} for key types: {e}"),
            }
        }
        let schema = builder.build()?;

        let action_column = Some(feed.action_column.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        verify_queries(&db, sql, &schema, &mode, &metadata, action_column.as_deref())?;

        let acl_settings = &settings.acl;
        let acl = AclResolver::new(
            AclColumns {
                permit_users: acl_settings.permit_users_column.clone(),
                deny_users: acl_settings.deny_users_column.clone(),
                permit_groups: acl_settings.permit_groups_column.clone(),
                deny_groups: acl_settings.deny_groups_column.clone(),
            },
            &acl_settings.principal_delimiter,
            &acl_settings.namespace,
        );

        let change_column = feed.change_tracking_column.trim().to_string();
        let incremental = (!sql.update.trim().is_empty()).then(|| {
            IncrementalLister::new(Arc::new(Watermark::starting_now()), change_column.clone())
        });
        let streamer = RowStreamer::new(db, !settings.database.disable_streaming);

        info!(
            "Key columns: {}; mode: {}",
            schema
                .columns()
                .iter()
                .map(|c| format!("{}:{}", c.name, c.ty))
                .collect::<Vec<_>>()
                .join(", "),
            mode_settings.name.trim()
        );
        debug!("{:#?}", settings);

        Ok(Self {
            schema,
            mode,
            metadata,
            acl,
            sql: sql.clone(),
            action_column,
            streamer,
            incremental,
            change_column,
            batch_size: feed.max_ids_per_batch,
            zone,
            verbose: false,
        })
    }

    /// Stop passes cooperatively when `flag` becomes true.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.streamer = self.streamer.with_cancel(flag);
        self
    }

    /// Show a record counter during passes.
    pub fn with_progress(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start incremental passes from `since` instead of the time of startup.
    pub fn with_watermark(mut self, since: DateTime<Utc>) -> Self {
        if self.incremental.is_some() {
            self.incremental = Some(IncrementalLister::new(
                Arc::new(Watermark::new(since)),
                self.change_column.clone(),
            ));
        }
        self
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn mode(&self) -> &PipelineMode {
        &self.mode
    }

    /// `None` when no update query is configured.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.incremental.as_ref().map(|l| l.watermark().get())
    }

    fn pass_input(&self) -> PassInput<'_> {
        PassInput {
            streamer: &self.streamer,
            factory: RecordFactory {
                schema: &self.schema,
                metadata: &self.metadata,
                action_column: self.action_column.as_deref(),
                lists_metadata: self.mode.lists_metadata(),
                zone: self.zone,
            },
            batch_size: self.batch_size,
            verbose: self.verbose,
        }
    }

    fn retrieval(&self) -> RetrievalContext<'_> {
        RetrievalContext {
            streamer: &self.streamer,
            schema: &self.schema,
            mode: &self.mode,
            metadata: &self.metadata,
            acl: &self.acl,
            content_sql: &self.sql.single_doc_content,
            acl_sql: &self.sql.acl,
            metadata_sql: &self.sql.metadata,
            zone: self.zone,
        }
    }

    /// List every document.
    pub fn full_pass<S: BatchSink>(&self, sink: S) -> Result<PassSummary> {
        full_pass(&self.pass_input(), &self.sql.every_doc_id, sink)
    }

    /// List documents changed since the watermark and advance it.
    pub fn incremental_pass<S: BatchSink>(&self, sink: S) -> Result<PassSummary> {
        let lister = self
            .incremental
            .as_ref()
            .ok_or_else(|| Error::config("incremental passes need sql.update"))?;
        lister.run(&self.pass_input(), &self.sql.update, sink)
    }

    pub fn supports_incremental(&self) -> bool {
        self.incremental.is_some()
    }

    pub fn fetch(&self, id: &DocId) -> Result<Retrieval> {
        self.retrieval().fetch(id)
    }

    pub fn acl(&self, id: &DocId) -> Result<Option<DocAcl>> {
        self.retrieval().acl(id)
    }
}

/// Configured queries in type-inference order, skipping blank ones.
fn named_queries(sql: &SqlSection) -> impl Iterator<Item = (&'static str, &str)> {
    [
        ("sql.every_doc_id", sql.every_doc_id.as_str()),
        ("sql.update", sql.update.as_str()),
        ("sql.single_doc_content", sql.single_doc_content.as_str()),
        ("sql.acl", sql.acl.as_str()),
        ("sql.metadata", sql.metadata.as_str()),
    ]
    .into_iter()
    .filter(|(_, q)| !q.trim().is_empty())
}

/// Every column a query's rows are read by must be in its result.
fn verify_queries(
    db: &SourceDb,
    sql: &SqlSection,
    schema: &KeySchema,
    mode: &PipelineMode,
    metadata: &MetadataColumns,
    action_column: Option<&str>,
) -> Result<()> {
    let mut listed: Vec<&str> = schema.names();
    listed.extend(action_column);
    if mode.lists_metadata() {
        listed.extend(metadata.columns());
    }
    verify_column_names(db, "sql.every_doc_id", &sql.every_doc_id, &listed)?;
    verify_column_names(db, "sql.update", &sql.update, &listed)?;

    if let Some(renderer) = mode.renderer() {
        verify_column_names(
            db,
            "sql.single_doc_content",
            &sql.single_doc_content,
            &renderer.required_columns(),
        )?;
        let meta_cols: Vec<&str> = metadata.columns().collect();
        if sql.metadata.trim().is_empty() {
            verify_column_names(db, "sql.single_doc_content", &sql.single_doc_content, &meta_cols)?;
        } else {
            verify_column_names(db, "sql.metadata", &sql.metadata, &meta_cols)?;
        }
    }
    Ok(())
}
