// manifest.rs — CapabilityManifest (spec §3, §4.6) and the deterministic
// trust-score formula.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    VerifiedPartner,
    Trusted,
    Standard,
    Unknown,
    Untrusted,
}

impl TrustLevel {
    fn base_score(self) -> i32 {
        match self {
            TrustLevel::VerifiedPartner => 10,
            TrustLevel::Trusted => 8,
            TrustLevel::Standard => 5,
            TrustLevel::Unknown => 3,
            TrustLevel::Untrusted => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    Ephemeral,
    Temporary,
    Permanent,
    Forever,
}

/// Published once at agent startup and immutable for the session (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityManifest {
    pub agent_id: String,
    pub version: String,
    #[serde(default)]
    pub agent_metadata: serde_json::Value,
    pub trust_level: TrustLevel,
    pub reversibility: Reversibility,
    pub undo_window_seconds: u64,
    pub sla_latency_ms: u64,
    pub retention: Retention,
    pub storage_location: String,
    pub human_review: bool,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl CapabilityManifest {
    /// Deterministic derivation (spec §4.6): base by `trust_level`, then
    /// adjustments for reversibility, retention, human review, and two
    /// capability-quality bonuses, clamped to `[0, 10]`.
    pub fn trust_score(&self) -> u8 {
        let mut score = self.trust_level.base_score();

        score -= match self.reversibility {
            Reversibility::Full => 0,
            Reversibility::Partial => 1,
            Reversibility::None => 2,
        };

        score -= match self.retention {
            Retention::Ephemeral | Retention::Temporary => 0,
            Retention::Permanent => 2,
            Retention::Forever => 3,
        };

        if self.human_review {
            score -= 1;
        }

        if self.capabilities.contains("idempotent") {
            score += 1;
        }

        if self.undo_window_seconds >= 24 * 3600 {
            score += 1;
        }

        score.clamp(0, 10) as u8
    }
}
