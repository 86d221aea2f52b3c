//! # agentos-kernel
//!
//! The kernel: owns and wires the policy engine (K1), sandbox (K4), memory
//! guard (K5), and circuit breaker (K7) behind one flight recorder (K3)
//! and one signal dispatcher (K2), in the dependency order from spec §2.
//! `submit` is the single entry point every `ExecutionRequest` passes
//! through.

pub mod config;
pub mod error;
pub mod kernel;

pub use config::KernelConfig;
pub use error::KernelError;
pub use kernel::Kernel;
