//! Task bookkeeping shared by both phases

use crate::error::TransformError;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Keeps the first fatal error of a phase and cancels everything else
///
/// Errors reported after the token tripped are usually
/// [`TransformError::Cancelled`] echoes; a real error still replaces an echo
/// so the caller sees what actually went wrong.
#[derive(Debug, Default)]
pub struct FirstError {
    error: Option<TransformError>,
}

impl FirstError {
    pub fn record(&mut self, err: TransformError, cancel: &CancellationToken) {
        if !err.is_cancelled() {
            error!(error = %err, "Task failed, cancelling run");
        }
        cancel.cancel();
        match &self.error {
            None => self.error = Some(err),
            Some(current) if current.is_cancelled() && !err.is_cancelled() => self.error = Some(err),
            Some(_) => {},
        }
    }

    pub fn into_result(self) -> Result<(), TransformError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_real_error_wins() {
        let cancel = CancellationToken::new();
        let mut first = FirstError::default();
        first.record(TransformError::Cancelled, &cancel);
        first.record(TransformError::Config("first".into()), &cancel);
        first.record(TransformError::Config("second".into()), &cancel);

        assert!(cancel.is_cancelled());
        let err = first.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: first");
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(FirstError::default().into_result().is_ok());
    }
}
