// entry.rs — AuditEntry data model (spec §3) and canonical hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentos_primitives::{ActionType, SignalKind};

/// A policy decision's effect, mirrored here so the recorder doesn't need
/// to depend on `agentos-policy` (which depends on the recorder).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordedEffect {
    Allow,
    Deny,
    Warn,
    RequireApproval,
    Log,
}

impl std::fmt::Display for RecordedEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordedEffect::Allow => "allow",
            RecordedEffect::Deny => "deny",
            RecordedEffect::Warn => "warn",
            RecordedEffect::RequireApproval => "require_approval",
            RecordedEffect::Log => "log",
        };
        write!(f, "{}", s)
    }
}

/// A single, immutable line in the flight recorder's hash-chained log.
///
/// `entry_hash` and `prev_hash` are populated by `FlightRecorder::append`;
/// callers build everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub agent_id: String,
    pub action_type: ActionType,
    pub tool_name: String,
    /// sha256 of the pre-redaction argument bytes (chain-of-custody).
    pub args_digest: String,
    pub decision: RecordedEffect,
    pub reason: String,
    #[serde(default)]
    pub signals: Vec<SignalKind>,
    pub prev_hash: String,
    pub entry_hash: String,
}

impl AuditEntry {
    /// Construct an entry with `prev_hash`/`entry_hash` left blank — the
    /// recorder fills both in as part of `append`.
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        agent_id: impl Into<String>,
        action_type: ActionType,
        tool_name: impl Into<String>,
        args_digest: impl Into<String>,
        decision: RecordedEffect,
        reason: impl Into<String>,
        signals: Vec<SignalKind>,
    ) -> Self {
        Self {
            seq: 0,
            ts: Utc::now(),
            agent_id: agent_id.into(),
            action_type,
            tool_name: tool_name.into(),
            args_digest: args_digest.into(),
            decision,
            reason: reason.into(),
            signals,
            prev_hash: String::new(),
            entry_hash: String::new(),
        }
    }

    /// Canonical bytes used as the hash-chain input, excluding `entry_hash`
    /// itself. Field order here is the encoding contract — changing it
    /// changes every downstream hash, so it is not derived from `Serialize`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let tuple = (
            self.seq,
            self.ts.timestamp_millis(),
            &self.agent_id,
            self.action_type,
            &self.tool_name,
            &self.args_digest,
            self.decision,
            &self.reason,
            &self.signals,
            &self.prev_hash,
        );
        serde_json::to_vec(&tuple).expect("tuple of primitive fields always serializes")
    }
}
