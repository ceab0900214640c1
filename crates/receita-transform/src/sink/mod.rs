//! Storage sink abstraction
//!
//! The engine hands assembled documents to a sink in bounded batches. Sinks own
//! persistence semantics (upsert, deduplication, indexes); the engine only
//! guarantees call order: `prepare`, any number of `create_records`,
//! `finalize`, then `save_metadata`.

pub mod jsonl;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;

/// One output document keyed by its full id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub id: String,
    pub document: String,
}

impl SinkRecord {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
        }
    }
}

/// Destination of assembled documents
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Called once before the first batch
    async fn prepare(&self) -> Result<()>;

    /// Persist one batch; an error aborts the run
    async fn create_records(&self, batch: &[SinkRecord]) -> Result<()>;

    /// Called once after the last batch
    async fn finalize(&self) -> Result<()>;

    async fn save_metadata(&self, key: &str, value: &str) -> Result<()>;
}
