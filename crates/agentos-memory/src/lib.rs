//! # agentos-memory
//!
//! The memory guard (spec §4.5): a write-path content screen for prompt
//! injection, code injection, and unicode manipulation, content-hash
//! integrity checks on read, and an independent non-mutating batch scan.

pub mod entry;
pub mod error;
pub mod screen;
pub mod store;

pub use entry::MemoryEntry;
pub use error::MemoryError;
pub use screen::{screen_content, Finding, FindingCategory, ScreenResult};
pub use store::{MemoryStore, WriteOutcome};
