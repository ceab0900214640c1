//! Error types for the join/enrichment engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for transform operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors raised while loading, joining and writing registry exports
///
/// Every variant except [`TransformError::Cancelled`] is fatal to a run. A
/// missing optional relation is never an error; lookups return `None` instead.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A dataset code that is not in the registry. Unreachable in a correct build.
    #[error("Unknown dataset code: {0}")]
    UnknownDataset(String),

    /// Wrong column count, unparseable number or date, unknown enumeration code
    #[error("Malformed row ({context}): {message}")]
    Structural { context: String, message: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error on {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Join store error: {0}")]
    Store(#[from] redb::Error),

    #[error("Corrupt join store value for {key}: {message}")]
    CorruptValue { key: String, message: String },

    #[error("Storage sink error: {0:#}")]
    Sink(anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] receita_common::ReceitaError),

    /// Another task failed first and the run is unwinding
    #[error("Run cancelled")]
    Cancelled,
}

impl TransformError {
    pub fn structural(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Prefix the context of a structural error with where the row came from
    pub fn at(self, position: impl std::fmt::Display) -> Self {
        match self {
            Self::Structural { context, message } => Self::Structural {
                context: format!("{position}, {context}"),
                message,
            },
            other => other,
        }
    }
}
