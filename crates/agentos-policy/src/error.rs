// error.rs — Error types for the policy engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("config error at '{path}': {message}")]
    ConfigError { path: String, message: String },

    #[error("failed to read policy file {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse policy YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("audit unavailable: {0}")]
    AuditUnavailable(#[from] agentos_audit::AuditError),

    #[error("internal policy engine error: {0}")]
    Internal(String),
}
