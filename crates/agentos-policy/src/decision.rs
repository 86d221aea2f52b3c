// decision.rs — PolicyDecision and the evaluation trace (spec §3, §4.1).

use serde::{Deserialize, Serialize};

use crate::rules::Effect;

/// The result of `PolicyEngine::evaluate` — one per `ExecutionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub effect: Effect,
    pub matched_rule: Option<String>,
    pub reason: String,
    pub rate_limited: bool,
    pub required_approval: bool,
    pub evaluation_ms: f64,
}

impl PolicyDecision {
    pub fn allow(matched_rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            effect: Effect::Allow,
            matched_rule: Some(matched_rule.into()),
            reason: reason.into(),
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: Effect::Deny,
            matched_rule: None,
            reason: reason.into(),
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        }
    }

    pub fn deny_matched(matched_rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: Effect::Deny,
            matched_rule: Some(matched_rule.into()),
            reason: reason.into(),
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        }
    }

    pub fn rate_limited(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: Effect::Deny,
            matched_rule: None,
            reason: reason.into(),
            rate_limited: true,
            required_approval: false,
            evaluation_ms: 0.0,
        }
    }

    pub fn require_approval(matched_rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: Effect::RequireApproval,
            matched_rule: Some(matched_rule.into()),
            reason: reason.into(),
            rate_limited: false,
            required_approval: true,
            evaluation_ms: 0.0,
        }
    }

    pub fn warn(matched_rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            effect: Effect::Warn,
            matched_rule: Some(matched_rule.into()),
            reason: reason.into(),
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        }
    }

    pub fn with_elapsed_ms(mut self, ms: f64) -> Self {
        self.evaluation_ms = ms;
        self
    }
}

/// A single step in the decision trail (decision observability pattern,
/// grounded on `ta_policy::engine::EvaluationStep`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    pub check: String,
    pub outcome: String,
    pub terminal: bool,
}

/// Full evaluation trace: every check `evaluate_with_trace` performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PolicyDecision,
    pub steps: Vec<EvaluationStep>,
}
