//! Batch sinks: where delivered record batches go.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::DocRecord;
use crate::error::{Error, Result};
use crate::utils::tempfiles::write_atomic;

/// Receives whole batches. A batch is either accepted in full or the call fails.
///
/// Delivery is at-least-once: a failed pass re-sends records on the next pass, so sinks
/// must tolerate duplicates.
pub trait BatchSink {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()>;
}

impl<S: BatchSink + ?Sized> BatchSink for &mut S {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()> {
        (**self).deliver(batch)
    }
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()> {
        (**self).deliver(batch)
    }
}

/// Writes each batch as a JSON file named by the blake3 digest of its contents.
/// Redelivering an identical batch rewrites the same file.
pub struct FeedDirSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl FeedDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("create feed dir {}", dir.display()), e))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written by this sink, in delivery order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl BatchSink for FeedDirSink {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()> {
        let payload = serde_json::to_vec_pretty(batch)
            .map_err(|e| Error::delivery("serialize batch", Some(Box::new(e))))?;
        let digest = blake3::hash(&payload).to_hex();
        let path = self.dir.join(format!("feed-{}.json", &digest[..16]));
        write_atomic(&path, &payload)
            .map_err(|e| Error::delivery(format!("write {}", path.display()), Some(Box::new(e))))?;
        debug!("wrote {} records to {}", batch.len(), path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Dry-run sink: logs each batch and keeps nothing.
#[derive(Default)]
pub struct LogSink {
    pub batches: usize,
    pub records: usize,
}

impl BatchSink for LogSink {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()> {
        self.batches += 1;
        self.records += batch.len();
        info!("[dry-run] batch {}: {} records", self.batches, batch.len());
        for record in batch {
            debug!(
                "  {}{}",
                record.doc_id(),
                if record.delete_from_index() { " (delete)" } else { "" }
            );
        }
        Ok(())
    }
}

/// Keeps delivered batches in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<DocRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> impl Iterator<Item = &DocRecord> {
        self.batches.iter().flatten()
    }
}

impl BatchSink for MemorySink {
    fn deliver(&mut self, batch: &[DocRecord]) -> Result<()> {
        self.batches.push(batch.to_vec());
        Ok(())
    }
}
