// error.rs — KernelError: the union of every subsystem's failure modes
// the kernel can surface at its boundary (spec §7 error taxonomy).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Policy(#[from] agentos_policy::PolicyError),

    #[error(transparent)]
    Audit(#[from] agentos_audit::AuditError),

    #[error(transparent)]
    Sandbox(#[from] agentos_sandbox::SandboxError),

    #[error(transparent)]
    Memory(#[from] agentos_memory::MemoryError),

    #[error(transparent)]
    Signal(#[from] agentos_signal::SignalError),

    #[error("circuit open: {0}")]
    CircuitOpen(#[from] agentos_breaker::CircuitOpenError),

    #[error("execution quota exceeded: {0:?}")]
    QuotaExceeded(agentos_policy::QuotaViolation),

    #[error("config error: {0}")]
    Config(String),
}
