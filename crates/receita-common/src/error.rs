//! Error types shared by the registry tooling

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, ReceitaError>;

/// Main error type for shared helpers
#[derive(Error, Debug)]
pub enum ReceitaError {
    #[error("Invalid taxpayer id {value:?}: {reason}")]
    InvalidId { value: String, reason: String },
}

impl ReceitaError {
    pub fn invalid_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
