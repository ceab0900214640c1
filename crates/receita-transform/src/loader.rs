//! Ingestion loader
//!
//! Phase 1 of a run: each row of every auxiliary dataset is written into the
//! join store under the key its dataset descriptor derives. Files of a
//! non-cumulative dataset are read by one blocking task each. The files of a
//! cumulative dataset share one task and are read in name order, so ordinals
//! come out the same on every load of the same directory. The phase ends only
//! when every task has stopped, so enrichment never observes a partially
//! loaded dataset.

use crate::error::{Result, TransformError};
use crate::progress::Progress;
use crate::reader::{self, RowPosition, SourceFile};
use crate::registry::{Dataset, DatasetRegistry, KeyColumn, PAISES, TABMUN};
use crate::store::{self, JoinStore};
use crate::tasks::FirstError;
use receita_common::ids;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Rows buffered per write transaction
pub const DEFAULT_WRITE_BATCH: usize = 4096;

/// Countries referenced by the exports but missing from the country table
const EXTRA_COUNTRIES: [(&str, &str); 16] = [
    ("15", "Aland, Ilhas"),
    ("150", "Canal, Ilhas do (Guernsey)"),
    ("151", "Canárias, Ilhas"),
    ("200", "Curaçao"),
    ("321", "Guernsey"),
    ("359", "Ilha de Man"),
    ("367", "Inglaterra"),
    ("393", "Jersey"),
    ("449", "Macedônia"),
    ("452", "Madeira, Ilha da"),
    ("498", "Montenegro"),
    ("578", "Palestina"),
    ("678", "Saint Kitts e Nevis"),
    ("699", "Sint Maarten"),
    ("737", "Sérvia"),
    ("994", "A Designar"),
];

/// Municipalities missing from the national municipality table:
/// (registry code, name, state, national code)
const EXTRA_MUNICIPALITIES: [(&str, &str, &str, &str); 1] =
    [("1182", "BOA ESPERANCA DO NORTE", "MT", "5101837")];

/// Outcome of the ingestion phase
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub files: usize,
    pub rows: u64,
    pub supplementary_rows: usize,
}

impl LoadStats {
    pub fn summary(&self) -> String {
        format!(
            "Loaded {} rows from {} files ({} supplementary rows)",
            self.rows, self.files, self.supplementary_rows
        )
    }
}

/// Split a raw row into the id it is keyed by and the stored value
pub fn keyed_row(dataset: &Dataset, mut row: Vec<String>, position: &RowPosition) -> Result<(String, Vec<String>)> {
    if row.len() < 2 {
        return Err(TransformError::structural(
            position.to_string(),
            format!("expected at least 2 columns in {}, got {}", dataset.prefix, row.len()),
        ));
    }

    match dataset.key_column {
        KeyColumn::Leading => {
            let id = row.remove(0);
            Ok((id, row))
        },
        KeyColumn::TaxpayerBase(column) => {
            if row.len() <= column {
                return Err(TransformError::structural(
                    position.to_string(),
                    format!("missing id column {} in {}", column, dataset.prefix),
                ));
            }
            let raw = row.remove(column);
            let id = ids::base_id(&raw)
                .map_err(|e| TransformError::structural(position.to_string(), e.to_string()))?;
            Ok((id, row))
        },
    }
}

/// Rows written before any file is read; real data overrides them
fn supplementary_rows(registry: &DatasetRegistry) -> Result<Vec<(String, Vec<u8>)>> {
    let countries = registry.get(PAISES)?;
    let municipalities = registry.get(TABMUN)?;

    let mut rows: Vec<(String, Vec<u8>)> = EXTRA_COUNTRIES
        .iter()
        .map(|(code, name)| (countries.key_for(code), store::serialize(&[*name])))
        .collect();
    rows.extend(EXTRA_MUNICIPALITIES.iter().map(|&(code, name, state, national)| {
        (municipalities.key_for(code), store::serialize(&["", name, state, national]))
    }));
    Ok(rows)
}

/// Files one loader task reads, in order
struct Task {
    dataset: usize,
    files: Vec<SourceFile>,
    bytes: u64,
}

fn plan(dir: &Path, registry: &DatasetRegistry) -> Result<Vec<Task>> {
    let mut planned = Vec::new();
    for (index, dataset) in registry.auxiliary().iter().enumerate() {
        let files = reader::find_files(dir, dataset)?;
        debug!(dataset = dataset.prefix, files = files.len(), "Found dataset files");
        if files.is_empty() {
            continue;
        }
        if dataset.is_cumulative {
            planned.push(Task {
                dataset: index,
                bytes: reader::expected_bytes(&files)?,
                files,
            });
        } else {
            for file in files {
                planned.push(Task {
                    dataset: index,
                    bytes: file.expected_bytes()?,
                    files: vec![file],
                });
            }
        }
    }
    Ok(planned)
}

fn load_file(
    dataset: &Dataset,
    file: &SourceFile,
    store: &JoinStore,
    progress: &Progress,
    cancel: &CancellationToken,
    write_batch: usize,
) -> Result<u64> {
    let mut batch = Vec::with_capacity(write_batch);
    let rows = reader::read_rows(file, dataset, progress, cancel, |row, position| {
        let (id, value) = keyed_row(dataset, row, position)?;
        batch.push((dataset.key_for(&id), store::serialize(&value)));
        if batch.len() >= write_batch {
            store.put_batch(&batch)?;
            batch.clear();
        }
        Ok(())
    })?;
    store.put_batch(&batch)?;
    Ok(rows)
}

/// Load every auxiliary dataset found in `dir` into `store`
///
/// # Arguments
/// * `dir` - export directory
/// * `write_batch` - rows per write transaction
///
/// # Returns
/// Load statistics, or the first fatal error of any file task
pub async fn load_auxiliary(
    dir: &Path,
    registry: Arc<DatasetRegistry>,
    store: Arc<JoinStore>,
    progress: &Progress,
    cancel: &CancellationToken,
    write_batch: usize,
) -> Result<LoadStats> {
    let write_batch = write_batch.max(1);
    let dir: PathBuf = dir.to_path_buf();

    let planned = {
        let registry = registry.clone();
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            let seeded = supplementary_rows(&registry)?;
            store.put_batch(&seeded)?;
            Ok::<_, TransformError>((seeded.len(), plan(&dir, &registry)?))
        })
        .await??
    };
    let (supplementary_rows, planned) = planned;

    let mut stats = LoadStats {
        files: planned.iter().map(|task| task.files.len()).sum(),
        supplementary_rows,
        ..Default::default()
    };
    info!(files = stats.files, "Loading auxiliary datasets");

    let mut tasks = JoinSet::new();
    for task in planned {
        progress.add_total(task.bytes);
        let registry = registry.clone();
        let store = store.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        tasks.spawn_blocking(move || {
            let dataset = &registry.auxiliary()[task.dataset];
            let mut total = 0;
            for file in &task.files {
                let rows = load_file(dataset, file, &store, &progress, &cancel, write_batch)?;
                debug!(dataset = dataset.prefix, file = %file.name(), rows, "Loaded file");
                total += rows;
            }
            Ok::<_, TransformError>(total)
        });
    }

    let mut first_error = FirstError::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(rows)) => stats.rows += rows,
            Ok(Err(err)) => first_error.record(err, cancel),
            Err(err) => first_error.record(TransformError::Task(err), cancel),
        }
    }
    first_error.into_result()?;

    tokio::task::spawn_blocking(move || store.sync()).await??;
    progress.finish();
    info!(rows = stats.rows, files = stats.files, "Auxiliary datasets loaded");
    Ok(stats)
}
