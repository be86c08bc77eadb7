//! Error types for the sync pipeline
//!
//! Cancellation is not an error: cancelled runs surface through
//! [`FetchStatus::Cancelled`](crate::download::FetchStatus) and
//! [`SyncOutcome::Cancelled`](crate::sync::SyncOutcome). Everything here is a
//! genuine failure. Full diagnostic detail belongs in the log; the short
//! [`user_message`](SyncError::user_message) is what reaches the host
//! application through the cancellation reason channel.

use crate::integrity::IntegrityError;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Every transfer attempt for a URL failed or stalled.
    #[error("download failed after {attempts} attempts: {url}")]
    RetriesExhausted { url: String, attempts: u32 },

    /// The fetched manifest was malformed or listed no files.
    #[error("manifest for {ai}/{model} has no usable entries")]
    EmptyManifest { ai: String, model: String },

    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Short operator-facing message for the cancellation reason channel.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::RetriesExhausted { .. } | SyncError::Http(_) => {
                "Model download failed.".to_string()
            }
            SyncError::EmptyManifest { ai, model } => {
                format!("Model file list for {ai}/{model} could not be retrieved.")
            }
            SyncError::Integrity(_) => "Downloaded model files failed verification.".to_string(),
            SyncError::Io(_) => "Model files could not be written to disk.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_retries_exhausted_user_message() {
        let err = SyncError::RetriesExhausted {
            url: "http://host/pkg/rife/files.json".to_string(),
            attempts: 4,
        };
        assert_eq!(err.user_message(), "Model download failed.");
        assert!(err.to_string().contains("4 attempts"));
    }

    #[test]
    fn test_empty_manifest_user_message_names_the_model() {
        let err = SyncError::EmptyManifest {
            ai: "RIFE".to_string(),
            model: "RIFE46".to_string(),
        };
        assert!(err.user_message().contains("RIFE/RIFE46"));
    }

    #[test]
    fn test_integrity_error_detail_survives_display() {
        let err = SyncError::from(IntegrityError::ChecksumMismatch {
            path: PathBuf::from("/cache/rife/model.pth"),
            expected: "8d2cb31a".to_string(),
            actual: "00000000".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("8d2cb31a"));
        assert!(msg.contains("00000000"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SyncError::from(io);
        assert!(matches!(err, SyncError::Io(_)));
        assert_eq!(err.user_message(), "Model files could not be written to disk.");
    }
}
