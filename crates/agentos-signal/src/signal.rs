// signal.rs — The `Signal` value and the agent lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentos_primitives::SignalKind;

/// A signal in flight: kind, where it came from, when it was raised, and an
/// optional handler-defined payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub source: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Signal {
    pub fn new(kind: SignalKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            ts: Utc::now(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// `RUNNING <-> STOPPED`, both absorbed into `TERMINATED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Running,
    Stopped,
    Terminated,
}

impl AgentState {
    pub fn is_terminated(self) -> bool {
        matches!(self, AgentState::Terminated)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Running => "running",
            AgentState::Stopped => "stopped",
            AgentState::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated_is_absorbing_by_flag() {
        assert!(AgentState::Terminated.is_terminated());
        assert!(!AgentState::Running.is_terminated());
        assert!(!AgentState::Stopped.is_terminated());
    }

    #[test]
    fn signal_builder_sets_payload() {
        let sig = Signal::new(SignalKind::Sigusr1, "watchdog")
            .with_payload(serde_json::json!({"reason": "diagnostic"}));
        assert_eq!(sig.source, "watchdog");
        assert!(sig.payload.is_some());
    }
}
