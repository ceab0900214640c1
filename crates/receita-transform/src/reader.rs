//! Archive reader
//!
//! Finds the files of a dataset in the export directory and streams their rows.
//! Exports ship either as zip archives (every member is read in turn) or as
//! plain delimited files. Text is ISO-8859-15 and is decoded field by field,
//! NUL characters are dropped, runs of whitespace collapse to one space and
//! edges are trimmed.

use crate::error::{Result, TransformError};
use crate::progress::{CountingReader, Progress};
use crate::registry::Dataset;
use encoding_rs::ISO_8859_15;
use regex::Regex;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a source file is stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Archive,
    Plain,
}

/// One file of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Uncompressed size: sum of member sizes for archives, file size otherwise
    pub fn expected_bytes(&self) -> Result<u64> {
        match self.kind {
            SourceKind::Plain => std::fs::metadata(&self.path)
                .map(|m| m.len())
                .map_err(|e| TransformError::io(&self.path, e)),
            SourceKind::Archive => {
                let mut archive = self.open_archive()?;
                let mut total = 0;
                for i in 0..archive.len() {
                    let member = archive.by_index_raw(i).map_err(|e| self.archive_error(e))?;
                    total += member.size();
                }
                Ok(total)
            },
        }
    }

    fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| TransformError::io(&self.path, e))
    }

    fn open_archive(&self) -> Result<zip::ZipArchive<File>> {
        zip::ZipArchive::new(self.open()?).map_err(|e| self.archive_error(e))
    }

    fn archive_error(&self, source: zip::result::ZipError) -> TransformError {
        TransformError::Archive {
            path: self.path.clone(),
            source,
        }
    }
}

/// List the files of `dataset` in `dir`, sorted by name
///
/// Only `.zip` and `.csv` files are supported; a matching file with any other
/// extension is a configuration error.
pub fn find_files(dir: &Path, dataset: &Dataset) -> Result<Vec<SourceFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TransformError::io(dir, e))?;
    let mut files = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| TransformError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !dataset.matches_file(&name) {
            continue;
        }
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = match extension.as_str() {
            "zip" => SourceKind::Archive,
            "csv" => SourceKind::Plain,
            other => {
                return Err(TransformError::Config(format!(
                    "Unsupported extension {other:?} for {} (dataset {})",
                    path.display(),
                    dataset.prefix
                )))
            },
        };
        files.push(SourceFile { path, kind });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Sum of [`SourceFile::expected_bytes`] over `files`
pub fn expected_bytes(files: &[SourceFile]) -> Result<u64> {
    files.iter().map(SourceFile::expected_bytes).sum()
}

/// Where a row came from, for error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPosition {
    pub source: String,
    pub line: u64,
}

impl fmt::Display for RowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}", self.source, self.line)
    }
}

/// Normalises decoded fields
pub struct FieldCleaner {
    spaces: Regex,
}

impl FieldCleaner {
    pub fn new() -> Result<Self> {
        let spaces = Regex::new(r"\s{2,}")
            .map_err(|e| TransformError::Config(format!("Invalid whitespace pattern: {e}")))?;
        Ok(Self { spaces })
    }

    /// Decode ISO-8859-15 bytes and clean the resulting text
    pub fn decode(&self, raw: &[u8]) -> String {
        let (text, _) = ISO_8859_15.decode_without_bom_handling(raw);
        self.clean(&text)
    }

    pub fn clean(&self, value: &str) -> String {
        let without_nul = value.replace('\0', "");
        self.spaces.replace_all(&without_nul, " ").trim().to_string()
    }
}

/// Stream every row of `file` into `on_row`
///
/// Rows come out in file order; archives are read member by member. The
/// cancellation token is checked before each row. Returns the number of rows
/// handed to the callback.
pub fn read_rows<F>(
    file: &SourceFile,
    dataset: &Dataset,
    progress: &Progress,
    cancel: &CancellationToken,
    mut on_row: F,
) -> Result<u64>
where
    F: FnMut(Vec<String>, &RowPosition) -> Result<()>,
{
    let cleaner = FieldCleaner::new()?;
    let name = file.name();

    match file.kind {
        SourceKind::Plain => {
            let reader = CountingReader::new(file.open()?, progress.clone());
            read_delimited(reader, &name, file, dataset, &cleaner, cancel, &mut on_row)
        },
        SourceKind::Archive => {
            let mut archive = file.open_archive()?;
            let mut rows = 0;
            for i in 0..archive.len() {
                let member = archive.by_index(i).map_err(|e| file.archive_error(e))?;
                if member.is_dir() {
                    continue;
                }
                let source = format!("{}:{}", name, member.name());
                debug!(source = %source, bytes = member.size(), "Reading archive member");
                let reader = CountingReader::new(member, progress.clone());
                rows += read_delimited(reader, &source, file, dataset, &cleaner, cancel, &mut on_row)?;
            }
            Ok(rows)
        },
    }
}

fn read_delimited<R, F>(
    reader: R,
    source: &str,
    file: &SourceFile,
    dataset: &Dataset,
    cleaner: &FieldCleaner,
    cancel: &CancellationToken,
    on_row: &mut F,
) -> Result<u64>
where
    R: Read,
    F: FnMut(Vec<String>, &RowPosition) -> Result<()>,
{
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(dataset.separator)
        .has_headers(dataset.has_header)
        .flexible(true)
        .from_reader(reader);

    let mut record = csv::ByteRecord::new();
    let mut rows = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }
        let more = csv.read_byte_record(&mut record).map_err(|e| TransformError::Csv {
            path: file.path.clone(),
            source: e,
        })?;
        if !more {
            break;
        }

        let position = RowPosition {
            source: source.to_string(),
            line: record.position().map(|p| p.line()).unwrap_or_default(),
        };
        let row = record.iter().map(|field| cleaner.decode(field)).collect();
        on_row(row, &position)?;
        rows += 1;
    }

    Ok(rows)
}
