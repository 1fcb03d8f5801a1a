//! Progress counter for listing passes.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::utils::config::PROGRESS_UPDATE_BATCH_SIZE;

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " records"
    )))
}

/// Update progress bar if available.
/// Uses try_lock so a contended bar skips the update instead of blocking the pass.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Counts records and refreshes the bar every [`PROGRESS_UPDATE_BATCH_SIZE`] items.
pub struct RecordCounter {
    bar: Option<ProgressBar>,
    count: usize,
}

impl RecordCounter {
    /// No bar unless `verbose`.
    pub fn new(verbose: bool, desc: &'static str) -> Self {
        Self {
            bar: verbose.then(|| create_counter(desc)),
            count: 0,
        }
    }

    pub fn tick(&mut self) {
        self.count += 1;
        if let Some(bar) = &self.bar
            && self.count.is_multiple_of(PROGRESS_UPDATE_BATCH_SIZE)
        {
            update_progress_bar(bar, PROGRESS_UPDATE_BATCH_SIZE);
        }
    }

    /// Report the remainder and end the line.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            let remaining = self.count % PROGRESS_UPDATE_BATCH_SIZE;
            if remaining > 0 {
                update_progress_bar(&bar, remaining);
            }
            if let Ok(mut bar) = bar.lock() {
                let _ = bar.refresh();
            }
            eprintln!();
        }
    }
}
