// rules.rs — The policy configuration surface (spec §3, §4.1, §6).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use agentos_primitives::ActionType;

use crate::condition::Condition;

/// The draft/final effect a rule or the overall evaluation produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
    Warn,
    RequireApproval,
    Log,
}

/// A cross-cutting rule, evaluated in descending `priority` order. Equal
/// priorities tie-break by insertion order (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub rule_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "action_types")]
    pub applies_to: BTreeSet<ActionType>,
    pub predicate: Condition,
    pub effect: Effect,
    pub priority: i64,
}

/// A targeted override inside the role's allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalPermission {
    pub tool_name: String,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub require_all: bool,
    /// Optional glob pattern the request's resource argument (`path`,
    /// `target_uri`, or `url`) must also match.
    #[serde(default)]
    pub resource_pattern: Option<String>,
}

/// Rolling-window resource limits. Unset fields are unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceQuota {
    #[serde(default)]
    pub max_requests_per_minute: Option<u32>,
    #[serde(default)]
    pub max_requests_per_hour: Option<u32>,
    #[serde(default)]
    pub max_execution_time_seconds: Option<u64>,
    #[serde(default)]
    pub max_concurrent_executions: Option<u32>,
    #[serde(default)]
    pub allowed_action_types: Option<BTreeSet<ActionType>>,
}

/// Risk-scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub max_risk_score: f64,
    pub require_approval_above: f64,
    pub deny_above: f64,
    #[serde(default)]
    pub high_risk_patterns: Vec<String>,
    #[serde(default)]
    pub allowed_domains: BTreeSet<String>,
    #[serde(default)]
    pub blocked_domains: BTreeSet<String>,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            max_risk_score: 1.0,
            require_approval_above: 0.7,
            deny_above: 0.9,
            high_risk_patterns: Vec::new(),
            allowed_domains: BTreeSet::new(),
            blocked_domains: BTreeSet::new(),
        }
    }
}
