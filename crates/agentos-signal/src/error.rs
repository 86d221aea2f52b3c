// error.rs — Error types for the signal dispatcher.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("agent '{0}' is not registered with the dispatcher")]
    UnknownAgent(String),
}
