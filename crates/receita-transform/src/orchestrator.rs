//! Run orchestration
//!
//! A run has two phases separated by a hard barrier:
//!
//! 1. **Ingestion**: every auxiliary dataset is loaded into a fresh join store.
//! 2. **Enrichment**: one blocking reader per establishment file feeds a
//!    bounded channel; a pool of workers assembles each row into a document
//!    and pushes it into the batch writer.
//!
//! One cancellation token covers the run. The first fatal error trips it,
//! every task stops at its next row and that error is returned. Batches
//! already handed to the sink stay there.

use crate::assembler::Assembler;
use crate::config::TransformConfig;
use crate::error::{Result, TransformError};
use crate::loader::{self, LoadStats};
use crate::progress::Progress;
use crate::reader::{self, RowPosition};
use crate::registry::DatasetRegistry;
use crate::sink::{SinkRecord, StorageSink};
use crate::store::JoinStore;
use crate::tasks::FirstError;
use crate::writer::BatchWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// File in the export directory holding the export date
pub const UPDATED_AT_FILE: &str = "updated_at.txt";

/// Metadata key the export date is saved under
pub const UPDATED_AT_KEY: &str = "updated-at";

const STORE_DIR_PREFIX: &str = "receita-";

type RowReceiver = Arc<Mutex<mpsc::Receiver<(Vec<String>, RowPosition)>>>;

/// Per-run directory of the join store, removed on drop unless kept
#[derive(Debug)]
pub struct StoreLocation {
    path: PathBuf,
    keep: bool,
}

impl StoreLocation {
    /// Create `<root>/receita-<YYYYMMDDHHMMSS>-<uuid>`
    pub fn create(root: &Path, keep: bool) -> Result<Self> {
        let name = format!(
            "{}{}-{}",
            STORE_DIR_PREFIX,
            chrono::Local::now().format("%Y%m%d%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let path = root.join(name);
        std::fs::create_dir_all(&path).map_err(|e| TransformError::io(&path, e))?;
        debug!(path = %path.display(), "Created join store directory");
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLocation {
    fn drop(&mut self) {
        if self.keep {
            info!(path = %self.path.display(), "Keeping join store directory");
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Could not remove join store directory");
        }
    }
}

fn is_store_dir_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(STORE_DIR_PREFIX) else {
        return false;
    };
    match rest.split_once('-') {
        Some((timestamp, suffix)) => {
            timestamp.len() == 14 && timestamp.bytes().all(|b| b.is_ascii_digit()) && !suffix.is_empty()
        },
        None => false,
    }
}

/// Remove join store directories left behind under `root` by interrupted runs
///
/// # Returns
/// Number of directories removed
pub fn cleanup_stale_stores(root: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(root).map_err(|e| TransformError::io(root, e))?;
    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| TransformError::io(root, e))?;
        let path = entry.path();
        if !path.is_dir() || !is_store_dir_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        std::fs::remove_dir_all(&path).map_err(|e| TransformError::io(&path, e))?;
        info!(path = %path.display(), "Removed stale join store directory");
        removed += 1;
    }
    Ok(removed)
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub load: LoadStats,
    pub rows_read: u64,
    pub records_written: u64,
    pub batches: u64,
    pub updated_at: Option<String>,
    pub kept_store: Option<PathBuf>,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "Loaded {} auxiliary rows from {} files, wrote {} records in {} batches ({:.1}s)",
            self.load.rows, self.load.files, self.records_written, self.batches, self.duration_secs
        )
    }
}

/// What a phase 2 task did
enum Finished {
    Read(u64),
    Assembled(u64),
}

/// Sequences both phases of a run
pub struct Orchestrator {
    config: TransformConfig,
}

impl Orchestrator {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run the whole transform into `sink`
    pub async fn run(&self, sink: Arc<dyn StorageSink>) -> Result<RunSummary> {
        self.run_with_cancel(sink, CancellationToken::new()).await
    }

    /// Same as [`Orchestrator::run`], cancellable from outside
    pub async fn run_with_cancel(&self, sink: Arc<dyn StorageSink>, cancel: CancellationToken) -> Result<RunSummary> {
        self.config.validate()?;
        let started = Instant::now();
        info!(
            source = %self.config.source_dir.display(),
            privacy = self.config.privacy,
            batch_size = self.config.batch_size,
            workers = self.config.workers,
            "Starting transform"
        );

        sink.prepare().await.map_err(TransformError::Sink)?;

        let location = StoreLocation::create(&self.config.store_root, self.config.keep_store)?;
        let store = Arc::new(JoinStore::create(location.path())?);
        let registry = Arc::new(DatasetRegistry::new());

        info!("Phase 1: Loading auxiliary datasets");
        let progress = Progress::for_phase("[Step 1 of 2] Loading data to key-value storage", self.config.show_progress);
        let load = loader::load_auxiliary(
            &self.config.source_dir,
            registry.clone(),
            store.clone(),
            &progress,
            &cancel,
            self.config.write_batch,
        )
        .await?;
        info!("{}", load.summary());

        info!("Phase 2: Enriching establishments");
        let writer = Arc::new(BatchWriter::new(sink.clone(), self.config.batch_size));
        let assembler = Assembler::new(store.clone(), registry.clone(), self.config.privacy);
        let rows_read = self.enrich(registry, assembler, writer.clone(), &cancel).await?;
        writer.flush().await?;
        sink.finalize().await.map_err(TransformError::Sink)?;

        let updated_at = self.save_updated_at(sink.as_ref()).await?;
        let written = writer.stats();
        let summary = RunSummary {
            load,
            rows_read,
            records_written: written.records,
            batches: written.batches,
            updated_at,
            kept_store: self.config.keep_store.then(|| location.path().to_path_buf()),
            duration_secs: started.elapsed().as_secs_f64(),
        };
        info!("{}", summary.summary());
        Ok(summary)
    }

    async fn enrich(
        &self,
        registry: Arc<DatasetRegistry>,
        assembler: Assembler,
        writer: Arc<BatchWriter>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let (files, bytes) = {
            let dir = self.config.source_dir.clone();
            let registry = registry.clone();
            tokio::task::spawn_blocking(move || {
                let files = reader::find_files(&dir, registry.primary())?;
                let bytes = reader::expected_bytes(&files)?;
                Ok::<_, TransformError>((files, bytes))
            })
            .await??
        };
        info!(files = files.len(), workers = self.config.workers, "Streaming establishment files");

        let progress = Progress::for_phase("[Step 2 of 2] Writing JSON documents", self.config.show_progress);
        progress.add_total(bytes);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let rx: RowReceiver = Arc::new(Mutex::new(rx));
        let mut tasks: JoinSet<Result<Finished>> = JoinSet::new();

        for file in files {
            let tx = tx.clone();
            let registry = registry.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                let rows = reader::read_rows(&file, registry.primary(), &progress, &cancel, |row, position| {
                    tx.blocking_send((row, position.clone()))
                        .map_err(|_| TransformError::Cancelled)
                })?;
                debug!(file = %file.name(), rows, "Establishment file read");
                Ok::<_, TransformError>(Finished::Read(rows))
            });
        }
        drop(tx);

        for _ in 0..self.config.workers {
            tasks.spawn(enrich_rows(rx.clone(), assembler.clone(), writer.clone(), cancel.clone()));
        }
        drop(rx);

        let mut rows_read = 0;
        let mut assembled = 0;
        let mut first_error = FirstError::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Finished::Read(rows))) => rows_read += rows,
                Ok(Ok(Finished::Assembled(records))) => assembled += records,
                Ok(Err(err)) => first_error.record(err, cancel),
                Err(err) => first_error.record(TransformError::Task(err), cancel),
            }
        }
        first_error.into_result()?;
        progress.finish();

        debug!(rows_read, assembled, "Enrichment finished");
        Ok(rows_read)
    }

    async fn save_updated_at(&self, sink: &dyn StorageSink) -> Result<Option<String>> {
        let path = self.config.source_dir.join(UPDATED_AT_FILE);
        let value = match tokio::fs::read_to_string(&path).await {
            Ok(value) => value.trim().to_string(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "No export date file, skipping metadata");
                return Ok(None);
            },
            Err(err) => return Err(TransformError::io(path, err)),
        };
        sink.save_metadata(UPDATED_AT_KEY, &value)
            .await
            .map_err(TransformError::Sink)?;
        Ok(Some(value))
    }
}

/// Worker loop: take rows until the channel closes or the run is cancelled
async fn enrich_rows(
    rows: RowReceiver,
    assembler: Assembler,
    writer: Arc<BatchWriter>,
    cancel: CancellationToken,
) -> Result<Finished> {
    let mut assembled = 0;
    loop {
        let next = {
            let mut rows = rows.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransformError::Cancelled),
                row = rows.recv() => row,
            }
        };
        let Some((row, position)) = next else {
            break;
        };

        let (id, document) = assembler.assemble_json(&row).await.map_err(|e| e.at(&position))?;
        writer.push(SinkRecord::new(id, document)).await?;
        assembled += 1;
    }
    Ok(Finished::Assembled(assembled))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_dir_names() {
        assert!(is_store_dir_name("receita-20261018120000-9f0c2a"));
        assert!(!is_store_dir_name("receita-2026-9f0c2a"));
        assert!(!is_store_dir_name("receita-20261018120000"));
        assert!(!is_store_dir_name("other-20261018120000-9f0c2a"));
    }

    #[test]
    fn test_store_location_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let location = StoreLocation::create(root.path(), false).unwrap();
        let path = location.path().to_path_buf();
        assert!(path.is_dir());
        assert!(is_store_dir_name(&path.file_name().unwrap().to_string_lossy()));
        drop(location);
        assert!(!path.exists());
    }

    #[test]
    fn test_store_location_kept() {
        let root = TempDir::new().unwrap();
        let path = StoreLocation::create(root.path(), true).unwrap().path().to_path_buf();
        assert!(path.is_dir());
    }

    #[test]
    fn test_cleanup_stale_stores() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("receita-20250101000000-abc")).unwrap();
        std::fs::create_dir(root.path().join("receita-20250102000000-def")).unwrap();
        std::fs::create_dir(root.path().join("unrelated")).unwrap();
        std::fs::write(root.path().join("receita-20250103000000-file"), b"").unwrap();

        assert_eq!(cleanup_stale_stores(root.path()).unwrap(), 2);
        assert!(root.path().join("unrelated").exists());
        assert!(root.path().join("receita-20250103000000-file").exists());
    }
}
