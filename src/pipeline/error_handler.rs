use log::warn;

use super::dispatcher::BatchDispatcher;
use super::sink::BatchSink;
use crate::PassSummary;
use crate::error::Result;

/// End a pass: always flush the dispatcher. On success the flush error (if any) is the pass
/// error; on failure the flush is best effort and the original error is returned.
pub fn finish_pass<S: BatchSink>(
    dispatcher: &mut BatchDispatcher<S>,
    result: Result<PassSummary>,
) -> Result<PassSummary> {
    match result {
        Ok(mut summary) => {
            dispatcher.flush()?;
            summary.batches = dispatcher.delivered_batches();
            Ok(summary)
        }
        Err(e) => {
            if let Err(flush_err) = dispatcher.flush() {
                warn!("flush after failed pass also failed: {flush_err}");
            }
            Err(e)
        }
    }
}
