//! # agentos-audit
//!
//! The flight recorder: an append-only, hash-chained, rotating audit log.
//! Every policy decision the kernel makes is recorded as an [`AuditEntry`]
//! before the caller sees the result, and the chain lets a verifier detect
//! any after-the-fact tampering.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use agentos_audit::{AuditEntry, FlightRecorder, RecordedEffect};
//! use agentos_primitives::ActionType;
//!
//! let mut recorder = FlightRecorder::open("/tmp/agentos/recorder").unwrap();
//! let entry = AuditEntry::draft(
//!     "agent-1", ActionType::FileRead, "fs", "deadbeef",
//!     RecordedEffect::Allow, "matched allow_list", vec![],
//! );
//! recorder.append(entry).unwrap();
//! ```

pub mod entry;
pub mod error;
pub mod hasher;
pub mod log;
pub mod redact;

pub use entry::{AuditEntry, RecordedEffect};
pub use error::AuditError;
pub use log::{FlightRecorder, DEFAULT_MAX_SEGMENT_BYTES};
pub use redact::redact;
