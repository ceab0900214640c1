//! In-memory sink, for tests and embedding

use super::{SinkRecord, StorageSink};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    prepared: bool,
    finalized: bool,
    records: Vec<SinkRecord>,
    batch_sizes: Vec<usize>,
    metadata: BTreeMap<String, String>,
}

/// Keeps every batch in memory
///
/// `failing_after(n)` makes the sink reject every batch after the first `n`.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<State>,
    fail_after: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(batches: usize) -> Self {
        Self {
            fail_after: Some(batches),
            ..Self::default()
        }
    }

    pub async fn records(&self) -> Vec<SinkRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().await.batch_sizes.clone()
    }

    pub async fn metadata(&self, key: &str) -> Option<String> {
        self.state.lock().await.metadata.get(key).cloned()
    }

    pub async fn is_prepared(&self) -> bool {
        self.state.lock().await.prepared
    }

    pub async fn is_finalized(&self) -> bool {
        self.state.lock().await.finalized
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    async fn prepare(&self) -> Result<()> {
        self.state.lock().await.prepared = true;
        Ok(())
    }

    async fn create_records(&self, batch: &[SinkRecord]) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.prepared {
            bail!("create_records called before prepare");
        }
        if self.fail_after.is_some_and(|n| state.batch_sizes.len() >= n) {
            bail!("memory sink rejected batch {}", state.batch_sizes.len() + 1);
        }
        state.batch_sizes.push(batch.len());
        state.records.extend_from_slice(batch);
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        self.state.lock().await.finalized = true;
        Ok(())
    }

    async fn save_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .metadata
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
