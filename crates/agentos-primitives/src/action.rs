// action.rs — Action classification and severity.
//
// Every tool call an agent attempts is classified into one of a fixed set
// of action types before it reaches the policy engine. Severity is a
// cross-cutting scale used by audit events, errors, and signal escalation.

use serde::{Deserialize, Serialize};

/// The kind of action an agent is requesting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    FileRead,
    FileWrite,
    CodeExecution,
    ApiCall,
    DatabaseQuery,
    DatabaseWrite,
    WorkflowTrigger,
    ToolCallGeneric,
}

impl ActionType {
    /// All variants, in declaration order — used by config loaders that
    /// need to validate `allowed_action_types` lists against the full set.
    pub const ALL: &'static [ActionType] = &[
        ActionType::FileRead,
        ActionType::FileWrite,
        ActionType::CodeExecution,
        ActionType::ApiCall,
        ActionType::DatabaseQuery,
        ActionType::DatabaseWrite,
        ActionType::WorkflowTrigger,
        ActionType::ToolCallGeneric,
    ];

    /// A base risk weight used by the policy engine's risk-scoring step
    /// (spec §4.1 step 5). Destructive-capable action types score higher.
    pub fn base_risk_weight(self) -> f64 {
        match self {
            ActionType::FileRead => 0.05,
            ActionType::FileWrite => 0.2,
            ActionType::CodeExecution => 0.35,
            ActionType::ApiCall => 0.15,
            ActionType::DatabaseQuery => 0.1,
            ActionType::DatabaseWrite => 0.3,
            ActionType::WorkflowTrigger => 0.2,
            ActionType::ToolCallGeneric => 0.1,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::FileRead => "file_read",
            ActionType::FileWrite => "file_write",
            ActionType::CodeExecution => "code_execution",
            ActionType::ApiCall => "api_call",
            ActionType::DatabaseQuery => "database_query",
            ActionType::DatabaseWrite => "database_write",
            ActionType::WorkflowTrigger => "workflow_trigger",
            ActionType::ToolCallGeneric => "tool_call_generic",
        };
        write!(f, "{}", s)
    }
}

/// Cross-cutting severity used by audit events and error envelopes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    High,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::High => "high",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}
