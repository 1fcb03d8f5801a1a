//! Listing passes: stream rows, build records, dispatch in batches.

use log::{info, warn};
use rusqlite::{Params, params};
use std::sync::Arc;

use super::context::RecordFactory;
use super::dispatcher::BatchDispatcher;
use super::error_handler::finish_pass;
use super::sink::BatchSink;
use crate::PassSummary;
use crate::engine::db_ops::{ColumnSet, Row, RowStreamer};
use crate::engine::progress::RecordCounter;
use crate::error::Result;

/// What every pass needs besides its SQL and sink.
#[derive(Clone, Copy)]
pub struct PassInput<'a> {
    pub streamer: &'a RowStreamer,
    pub factory: RecordFactory<'a>,
    pub batch_size: usize,
    /// Show a record counter.
    pub verbose: bool,
}

/// List every document returned by `sql`.
pub fn full_pass<S: BatchSink>(input: &PassInput<'_>, sql: &str, sink: S) -> Result<PassSummary> {
    info!("Full listing pass started");
    let mut dispatcher = BatchDispatcher::new(sink, input.batch_size)?;
    let result = list_rows(input, sql, params![], false, &mut dispatcher, |_| {}).map(|(s, _)| s);
    let summary = finish_pass(&mut dispatcher, result)?;
    log_summary("Full", &summary);
    Ok(summary)
}

/// Stream rows into the dispatcher without flushing. `observe` sees every row, including
/// rows skipped for a bad identity. Returns the counters and the result's columns.
pub(crate) fn list_rows<S, P, F>(
    input: &PassInput<'_>,
    sql: &str,
    params: P,
    crawl_immediately: bool,
    dispatcher: &mut BatchDispatcher<S>,
    mut observe: F,
) -> Result<(PassSummary, Arc<ColumnSet>)>
where
    S: BatchSink,
    P: Params,
    F: FnMut(&Row),
{
    let mut summary = PassSummary::default();
    let mut counter = RecordCounter::new(input.verbose, "Listing");
    let outcome = input.streamer.stream(sql, params, |row| {
        observe(&row);
        match input.factory.record(&row, crawl_immediately) {
            Ok(record) => {
                dispatcher.add(record)?;
                summary.records += 1;
                counter.tick();
            }
            Err(reason) => {
                warn!("Skipping row: {reason}");
                summary.skipped += 1;
            }
        }
        Ok(())
    });
    counter.finish();
    let outcome = outcome?;
    summary.rows = outcome.rows;
    summary.cancelled = outcome.cancelled;
    Ok((summary, outcome.columns))
}

pub(crate) fn log_summary(kind: &str, summary: &PassSummary) {
    let state = if summary.cancelled { "cancelled" } else { "done" };
    info!(
        "{kind} pass {state}: {} rows, {} records in {} batches, {} skipped",
        summary.rows, summary.records, summary.batches, summary.skipped
    );
}
