//! # agentos-breaker
//!
//! Lock-free circuit breaker (spec §4.7). Guards any downstream call the
//! kernel makes (sandboxed tool execution, the trust sidecar's backend
//! forwarding) behind a CLOSED/OPEN/HALF_OPEN state machine with an
//! atomic compare-and-swap fast path — no locks on the call-admission
//! path (spec §5).

pub mod breaker;
pub mod error;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::CircuitOpenError;
