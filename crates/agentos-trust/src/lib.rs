//! # agentos-trust
//!
//! The inter-agent trust sidecar (spec §4.6): a reverse proxy in front of
//! a protected backend agent. Exposes a capability manifest, screens
//! outbound payloads for sensitive data, enforces hard-block and warning
//! rules derived from the manifest's trust score, and forwards accepted
//! traffic to the backend behind a circuit breaker.

pub mod config;
pub mod error;
pub mod manifest;
pub mod quarantine;
pub mod screen;
pub mod server;
pub mod state;

pub use config::TrustConfig;
pub use error::{TrustError, TrustWarning};
pub use manifest::{CapabilityManifest, Reversibility, Retention, TrustLevel};
pub use quarantine::{QuarantineRecord, QuarantineStore};
pub use screen::{screen_payload, screen_text, ScreenResult, SensitiveFinding, SensitiveKind};
pub use server::build_router;
pub use state::SidecarState;
