// error.rs — Sandbox error taxonomy.

use thiserror::Error;

use crate::budget::SandboxBudget;
use crate::violation::SandboxViolation;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("static scan rejected the request: {0:?}")]
    StaticViolation(SandboxViolation),

    #[error("runtime hook blocked an import: {0:?}")]
    RuntimeViolation(SandboxViolation),

    #[error("{0}")]
    BudgetExceeded(SandboxBudget),

    #[error("sandboxed execution panicked")]
    Panicked,
}
