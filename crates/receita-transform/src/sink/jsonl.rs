//! JSON Lines file sink
//!
//! Writes one document per line. Metadata goes to a sidecar JSON object next to
//! the output file (`<output>.metadata.json`).

use super::{SinkRecord, StorageSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::info;

pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    metadata: Mutex<BTreeMap<String, String>>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
            metadata: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".metadata.json");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StorageSink for JsonLinesSink {
    async fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .await
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        *self.writer.lock().await = Some(BufWriter::new(file));
        Ok(())
    }

    async fn create_records(&self, batch: &[SinkRecord]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .context("JSON Lines sink used before prepare")?;
        for record in batch {
            writer.write_all(record.document.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer
                .flush()
                .await
                .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        }
        info!(path = %self.path.display(), "Output written");
        Ok(())
    }

    async fn save_metadata(&self, key: &str, value: &str) -> Result<()> {
        let mut metadata = self.metadata.lock().await;
        metadata.insert(key.to_string(), value.to_string());
        let path = self.metadata_path();
        tokio::fs::write(&path, serde_json::to_vec_pretty(&*metadata)?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
