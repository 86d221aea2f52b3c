// error.rs — Error types for the flight recorder.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during flight-recorder operations.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit segment at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to append entry: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The flight recorder's hash chain is broken — tampering or corruption.
    #[error("integrity check failed at sequence {seq}: expected prev_hash {expected}, got {actual}")]
    IntegrityViolation {
        seq: u64,
        expected: String,
        actual: String,
    },

    #[error("failed to rotate segment: {0}")]
    RotationFailed(String),

    #[error("audit index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("failed to hash file at {path}: {source}")]
    HashFileFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
