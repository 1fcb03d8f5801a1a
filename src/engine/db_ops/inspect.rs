//! Startup inspection of configured queries: result columns and declared types, without executing.

use log::{debug, warn};

use super::connection::SourceDb;
use super::row::ColumnSet;
use super::streamer::sql_preview;
use crate::error::{Error, Result};

/// Prepare `sql` and return its result columns.
pub fn query_columns(db: &SourceDb, sql: &str) -> Result<ColumnSet> {
    let conn = db.open()?;
    let stmt = conn
        .prepare(sql)
        .map_err(|e| Error::query(format!("prepare `{}`", sql_preview(sql)), e))?;
    Ok(ColumnSet::from_statement(&stmt))
}

/// Require every name in `names` to appear (ignoring case) in the result of `sql`.
///
/// A query that cannot be prepared without parameters, or that returns no columns, is logged
/// and skipped: it will fail loudly on first use instead.
pub fn verify_column_names(db: &SourceDb, sql_key: &str, sql: &str, names: &[&str]) -> Result<()> {
    if sql.trim().is_empty() || names.is_empty() {
        return Ok(());
    }
    let columns = match query_columns(db, sql) {
        Ok(c) => c,
        Err(e) => {
            warn!("Skipping column check for {sql_key}: {e}");
            return Ok(());
        }
    };
    if columns.is_empty() {
        debug!("{sql_key} returns no columns; skipping column check");
        return Ok(());
    }
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| !columns.contains(n))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "[{}] not found in query {sql_key}",
            missing.join(", ")
        )))
    }
}
