//! Incremental passes driven by a change-tracking watermark.
//!
//! The watermark is bound as the only parameter of the update query. After a pass has
//! flushed, it moves to the newest change-tracking value seen, or to "now" when the result
//! has no change-tracking column. A result with the column but only NULL values leaves it
//! where it was. Failed or cancelled passes never move it.
//!
//! Rows that change and change back inside one tracking tick can be missed; the next full
//! pass picks them up.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::dispatcher::BatchDispatcher;
use super::error_handler::finish_pass;
use super::lister::{PassInput, list_rows, log_summary};
use super::sink::BatchSink;
use crate::engine::values::{KeyValue, format_timestamp};
use crate::error::{Error, Result};
use crate::{ColumnType, PassSummary};

/// Shared high-water mark. Only [`IncrementalLister`] moves it, with a single replace.
#[derive(Debug)]
pub struct Watermark {
    value: Mutex<DateTime<Utc>>,
}

impl Watermark {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            value: Mutex::new(start),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn get(&self) -> DateTime<Utc> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, ts: DateTime<Utc>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = ts;
    }
}

/// Idle/Running flag; dropping the guard returns to Idle on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::PassInProgress)?;
        Ok(RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct IncrementalLister {
    watermark: Arc<Watermark>,
    change_column: String,
    running: AtomicBool,
}

impl IncrementalLister {
    pub fn new(watermark: Arc<Watermark>, change_column: impl Into<String>) -> Self {
        Self {
            watermark,
            change_column: change_column.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn watermark(&self) -> &Arc<Watermark> {
        &self.watermark
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// List rows changed since the watermark, with crawl-immediately set, then commit.
    pub fn run<S: BatchSink>(
        &self,
        input: &PassInput<'_>,
        update_sql: &str,
        sink: S,
    ) -> Result<PassSummary> {
        let _guard = RunGuard::acquire(&self.running)?;
        let zone = input.factory.zone;
        let since = self.watermark.get();
        info!(
            "Incremental pass started (changes since {})",
            format_timestamp(since, zone)
        );

        let mut dispatcher = BatchDispatcher::new(sink, input.batch_size)?;
        let mut latest: Option<DateTime<Utc>> = None;
        let column = self.change_column.as_str();
        let param = Value::Text(format_timestamp(since, zone));
        let listed = list_rows(
            input,
            update_sql,
            params_from_iter([param]),
            true,
            &mut dispatcher,
            |row| {
                let Some(cell) = row.get(column) else {
                    return;
                };
                match KeyValue::from_sql(ColumnType::Timestamp, cell, zone) {
                    Ok(Some(KeyValue::Timestamp(ts))) => {
                        if latest.is_none_or(|l| ts > l) {
                            latest = Some(ts);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Ignoring {column} value: {e}"),
                }
            },
        );
        let (result, has_column) = match listed {
            Ok((summary, columns)) => (Ok(summary), columns.contains(column)),
            Err(e) => (Err(e), false),
        };
        let summary = finish_pass(&mut dispatcher, result)?;
        log_summary("Incremental", &summary);

        if summary.cancelled {
            info!("Watermark unchanged after cancelled pass");
            return Ok(summary);
        }
        match (has_column, latest) {
            (false, _) => self.watermark.commit(Utc::now()),
            (true, Some(ts)) => self.watermark.commit(ts),
            (true, None) => debug!("No {column} values in pass; watermark unchanged"),
        }
        debug!(
            "Watermark now {}",
            format_timestamp(self.watermark.get(), zone)
        );
        Ok(summary)
    }
}
