//! # agentos-signal
//!
//! The lifecycle signal dispatcher: FIFO, per-agent delivery of the
//! POSIX-style signal vocabulary (`SIGSTOP`..`SIGDRIFT`), with unmaskable
//! signals (`SIGKILL`, `SIGPOLICY`, `SIGTRUST`) always jumping the queue,
//! and a `mask()` RAII scope guard for deferring the rest.

pub mod dispatcher;
pub mod error;
pub mod signal;

pub use dispatcher::{MaskGuard, SignalDispatcher};
pub use error::SignalError;
pub use signal::{AgentState, Signal};

pub use agentos_primitives::SignalKind;
