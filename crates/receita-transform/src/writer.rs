//! Batch writer
//!
//! Accumulates documents from every enrichment worker behind one lock and
//! hands full batches to the storage sink. A full buffer is swapped out under
//! the lock and written outside of it, so workers keep assembling while a
//! batch is in flight.

use crate::error::{Result, TransformError};
use crate::sink::{SinkRecord, StorageSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Records per sink call
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Counters of what reached the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub records: u64,
    pub batches: u64,
}

pub struct BatchWriter {
    sink: Arc<dyn StorageSink>,
    batch_size: usize,
    buffer: Mutex<Vec<SinkRecord>>,
    records: AtomicU64,
    batches: AtomicU64,
}

impl BatchWriter {
    pub fn new(sink: Arc<dyn StorageSink>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch_size,
            buffer: Mutex::new(Vec::with_capacity(batch_size)),
            records: AtomicU64::new(0),
            batches: AtomicU64::new(0),
        }
    }

    /// Add one record, writing a batch when the buffer is full
    pub async fn push(&self, record: SinkRecord) -> Result<()> {
        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(record);
            if buffer.len() >= self.batch_size {
                Some(std::mem::replace(&mut *buffer, Vec::with_capacity(self.batch_size)))
            } else {
                None
            }
        };

        match full {
            Some(batch) => self.write(batch).await,
            None => Ok(()),
        }
    }

    /// Write whatever is left in the buffer
    pub async fn flush(&self) -> Result<()> {
        let rest = std::mem::take(&mut *self.buffer.lock().await);
        if rest.is_empty() {
            return Ok(());
        }
        self.write(rest).await
    }

    async fn write(&self, batch: Vec<SinkRecord>) -> Result<()> {
        self.sink
            .create_records(&batch)
            .await
            .map_err(TransformError::Sink)?;
        self.records.fetch_add(batch.len() as u64, Ordering::Relaxed);
        let batches = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(batch = batches, records = batch.len(), "Batch written");
        Ok(())
    }

    pub fn stats(&self) -> WriteStats {
        WriteStats {
            records: self.records.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}
