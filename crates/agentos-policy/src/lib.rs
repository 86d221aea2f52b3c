//! # agentos-policy
//!
//! The default-deny policy engine (spec §4.1): mandatory safety screen,
//! allow-lists, conditional permissions, cross-cutting ABAC rules, risk
//! scoring, and rolling-window quotas, evaluated as one pipeline and
//! recorded to the flight recorder on every call.

pub mod condition;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod quota;
pub mod risk;
pub mod rules;
pub mod safety;
pub mod tables;

pub use condition::{Condition, ConditionOutcome, Operator};
pub use config::{load_file, load_str, PolicyConfig};
pub use decision::{EvaluationStep, EvaluationTrace, PolicyDecision};
pub use engine::PolicyEngine;
pub use error::PolicyError;
pub use quota::{ConcurrencyGuard, QuotaTracker, QuotaViolation};
pub use risk::RiskAssessment;
pub use rules::{ConditionalPermission, Effect, PolicyRule, ResourceQuota, RiskPolicy};
pub use safety::{mandatory_safety_screen, matches_resource_pattern, SafetyViolation};
pub use tables::PolicyTables;
