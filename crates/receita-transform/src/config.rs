//! Run configuration

use crate::error::{Result, TransformError};
use crate::loader::DEFAULT_WRITE_BATCH;
use crate::writer::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of concurrent enrichment workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Default capacity of the row channel between file readers and workers.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration of one transform run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Directory holding the export files
    pub source_dir: PathBuf,
    /// Redact personal data from the output
    pub privacy: bool,
    /// Records per sink call
    pub batch_size: usize,
    /// Concurrent enrichment workers
    pub workers: usize,
    /// Rows buffered between readers and workers
    pub channel_capacity: usize,
    /// Rows per join store write transaction during ingestion
    pub write_batch: usize,
    /// Keep the join store directory after the run, for inspection
    pub keep_store: bool,
    /// Parent directory of the per-run join store directory
    pub store_root: PathBuf,
    /// Draw progress bars on the terminal
    pub show_progress: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            privacy: true,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            write_batch: DEFAULT_WRITE_BATCH,
            keep_store: false,
            store_root: std::env::temp_dir(),
            show_progress: true,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl TransformConfig {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment (and `.env`) over the defaults
    ///
    /// Environment variables:
    /// - `RECEITA_SOURCE_DIR`
    /// - `RECEITA_PRIVACY` (true/false)
    /// - `RECEITA_BATCH_SIZE`
    /// - `RECEITA_WORKERS`
    /// - `RECEITA_CHANNEL_CAPACITY`
    /// - `RECEITA_WRITE_BATCH`
    /// - `RECEITA_KEEP_STORE` (true/false)
    /// - `RECEITA_STORE_ROOT`
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            source_dir: std::env::var("RECEITA_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_dir),
            privacy: env_parsed("RECEITA_PRIVACY").unwrap_or(defaults.privacy),
            batch_size: env_parsed("RECEITA_BATCH_SIZE").unwrap_or(defaults.batch_size),
            workers: env_parsed("RECEITA_WORKERS").unwrap_or(defaults.workers),
            channel_capacity: env_parsed("RECEITA_CHANNEL_CAPACITY").unwrap_or(defaults.channel_capacity),
            write_batch: env_parsed("RECEITA_WRITE_BATCH").unwrap_or(defaults.write_batch),
            keep_store: env_parsed("RECEITA_KEEP_STORE").unwrap_or(defaults.keep_store),
            store_root: std::env::var("RECEITA_STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_root),
            show_progress: defaults.show_progress,
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_privacy(mut self, privacy: bool) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_write_batch(mut self, rows: usize) -> Self {
        self.write_batch = rows;
        self
    }

    pub fn with_keep_store(mut self, keep: bool) -> Self {
        self.keep_store = keep;
        self
    }

    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = root.into();
        self
    }

    pub fn with_show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Reject settings a run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TransformError::Config("batch_size must be greater than 0".into()));
        }
        if self.workers == 0 {
            return Err(TransformError::Config("workers must be greater than 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(TransformError::Config("channel_capacity must be greater than 0".into()));
        }
        if self.write_batch == 0 {
            return Err(TransformError::Config("write_batch must be greater than 0".into()));
        }
        if !self.source_dir.is_dir() {
            return Err(TransformError::Config(format!(
                "source directory {} does not exist",
                self.source_dir.display()
            )));
        }
        Ok(())
    }
}
