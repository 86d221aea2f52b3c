//! # agentos-sandbox
//!
//! The execution sandbox (spec §4.4): a static lexical scan for blocked
//! symbols and imports, a runtime import-interception hook for
//! defence-in-depth, and wall-clock resource budgeting that raises
//! `SIGBUDGET` through the signal subsystem on overrun.

pub mod budget;
pub mod config;
pub mod error;
pub mod runtime;
pub mod sandbox;
pub mod static_scan;
pub mod violation;

pub use budget::{BudgetKind, ResourceLimits, SandboxBudget};
pub use config::SandboxConfig;
pub use error::SandboxError;
pub use runtime::ImportGuard;
pub use sandbox::{Sandbox, ShadowResult};
pub use static_scan::scan_source;
pub use violation::{SandboxViolation, ViolationKind};
