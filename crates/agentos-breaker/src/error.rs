// error.rs — Circuit breaker error taxonomy.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("circuit open; retry after {retry_after_seconds}s")]
pub struct CircuitOpenError {
    pub retry_after_seconds: u64,
}
