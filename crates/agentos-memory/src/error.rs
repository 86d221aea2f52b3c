// error.rs — Memory guard error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("content rejected by memory screen: {reason}")]
    Rejected { reason: String },

    #[error("memory entry '{id}' failed integrity check: stored content_hash does not match recomputed hash")]
    Tampered { id: String },

    #[error("memory entry '{id}' not found")]
    NotFound { id: String },

    #[error("memory store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory entry file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
