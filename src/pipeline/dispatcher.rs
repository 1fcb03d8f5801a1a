//! Bounded in-order buffer that delivers records to a sink in fixed-size batches.

use log::{debug, warn};

use super::sink::BatchSink;
use crate::DocRecord;
use crate::error::{Error, Result};

pub struct BatchDispatcher<S: BatchSink> {
    sink: S,
    buffer: Vec<DocRecord>,
    max: usize,
    delivered_batches: usize,
    delivered_records: usize,
}

impl<S: BatchSink> BatchDispatcher<S> {
    /// `max` is the batch size and must be positive.
    pub fn new(sink: S, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(Error::config("max ids per batch must be greater than 0"));
        }
        Ok(Self {
            sink,
            buffer: Vec::with_capacity(max),
            max,
            delivered_batches: 0,
            delivered_records: 0,
        })
    }

    /// Append one record; when the buffer reaches the batch size it is delivered before returning.
    /// On delivery failure the buffered records stay buffered and the error is returned.
    pub fn add(&mut self, record: DocRecord) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max {
            self.deliver()?;
        }
        Ok(())
    }

    /// Deliver whatever is buffered. No-op when empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.deliver()
    }

    fn deliver(&mut self) -> Result<()> {
        self.sink.deliver(&self.buffer)?;
        debug!("delivered batch of {}", self.buffer.len());
        self.delivered_batches += 1;
        self.delivered_records += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn delivered_batches(&self) -> usize {
        self.delivered_batches
    }

    pub fn delivered_records(&self) -> usize {
        self.delivered_records
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: BatchSink> Drop for BatchDispatcher<S> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(
                "dropping {} undelivered records; they will be picked up by the next pass",
                self.buffer.len()
            );
        }
    }
}
