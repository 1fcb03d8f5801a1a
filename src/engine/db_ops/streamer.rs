//! Forward-only row streaming with bounded client memory and cooperative cancellation.

use log::debug;
use rusqlite::types::Value;
use rusqlite::{Params, Rows};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::connection::SourceDb;
use super::row::{ColumnSet, Row};
use crate::error::{Error, Result};

/// Result of one [`RowStreamer::stream`] call.
#[derive(Clone, Debug)]
pub struct StreamOutcome {
    /// Rows handed to the callback.
    pub rows: usize,
    /// Stopped early because the cancel flag was set.
    pub cancelled: bool,
    pub columns: Arc<ColumnSet>,
}

/// Runs one query per call on a fresh read-only connection.
///
/// With streaming on, each row is handed over as soon as the cursor steps onto it. With
/// streaming off, the whole result is read before the first row is handed over; rows read
/// before a cursor failure are still handed over before the error is returned. Connection,
/// statement and cursor are scoped to the call and released on every exit path.
#[derive(Clone, Debug)]
pub struct RowStreamer {
    db: SourceDb,
    streaming: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl RowStreamer {
    pub fn new(db: SourceDb, streaming: bool) -> Self {
        Self {
            db,
            streaming,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn db(&self) -> &SourceDb {
        &self.db
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Execute `sql` with positional `params` and call `on_row` for each row, in result order.
    /// An error from `on_row` stops the stream and is returned as-is.
    pub fn stream<P, F>(&self, sql: &str, params: P, mut on_row: F) -> Result<StreamOutcome>
    where
        P: Params,
        F: FnMut(Row) -> Result<()>,
    {
        let conn = self.db.open()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::query(format!("prepare `{}`", sql_preview(sql)), e))?;
        let columns = Arc::new(ColumnSet::from_statement(&stmt));
        let mut cursor = stmt
            .query(params)
            .map_err(|e| Error::query(format!("execute `{}`", sql_preview(sql)), e))?;

        let mut outcome = StreamOutcome {
            rows: 0,
            cancelled: false,
            columns: Arc::clone(&columns),
        };
        let mut held: Vec<Vec<Value>> = Vec::new();
        loop {
            if self.is_cancelled() {
                debug!("stream cancelled after {} rows", outcome.rows + held.len());
                outcome.cancelled = true;
                break;
            }
            let values = match next_values(&mut cursor, columns.len()) {
                Ok(Some(values)) => values,
                Ok(None) => break,
                Err(e) => {
                    hand_over(&mut held, &columns, &mut on_row, &mut outcome.rows)?;
                    return Err(e);
                }
            };
            if self.streaming {
                outcome.rows += 1;
                on_row(Row::new(Arc::clone(&columns), values))?;
            } else {
                held.push(values);
            }
        }
        hand_over(&mut held, &columns, &mut on_row, &mut outcome.rows)?;
        Ok(outcome)
    }

    /// First row of the result, or `None` when it is empty. The cursor is not drained.
    pub fn first_row<P: Params>(&self, sql: &str, params: P) -> Result<Option<Row>> {
        let conn = self.db.open()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::query(format!("prepare `{}`", sql_preview(sql)), e))?;
        let columns = Arc::new(ColumnSet::from_statement(&stmt));
        let mut cursor = stmt
            .query(params)
            .map_err(|e| Error::query(format!("execute `{}`", sql_preview(sql)), e))?;
        Ok(next_values(&mut cursor, columns.len())?.map(|values| Row::new(columns, values)))
    }

    /// All rows of a small result (ACL and metadata lookups).
    pub fn collect<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.stream(sql, params, |row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }
}

fn next_values(cursor: &mut Rows<'_>, width: usize) -> Result<Option<Vec<Value>>> {
    let Some(row) = cursor.next().map_err(|e| Error::query("read row", e))? else {
        return Ok(None);
    };
    let values = (0..width)
        .map(|i| row.get::<_, Value>(i))
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::query("read column", e))?;
    Ok(Some(values))
}

fn hand_over<F>(
    held: &mut Vec<Vec<Value>>,
    columns: &Arc<ColumnSet>,
    on_row: &mut F,
    count: &mut usize,
) -> Result<()>
where
    F: FnMut(Row) -> Result<()>,
{
    for values in held.drain(..) {
        *count += 1;
        on_row(Row::new(Arc::clone(columns), values))?;
    }
    Ok(())
}

/// First line of a query, shortened for error context.
pub fn sql_preview(sql: &str) -> String {
    const MAX: usize = 80;
    let line = sql.trim().lines().next().unwrap_or_default();
    match line.char_indices().nth(MAX) {
        Some((i, _)) => format!("{}...", &line[..i]),
        None => line.to_string(),
    }
}
