// request.rs — ExecutionRequest: the single unit of work the kernel mediates.
//
// Built once by the caller and consumed by the policy engine. Immutable
// once submitted — nothing downstream mutates it in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionType;
use crate::value::Value;

/// A request to perform an action, submitted to the kernel for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub id: Uuid,
    pub agent_id: String,
    pub action_type: ActionType,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionRequest {
    pub fn new(
        agent_id: impl Into<String>,
        action_type: ActionType,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            action_type,
            tool_name: tool_name.into(),
            arguments: BTreeMap::new(),
            context: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Build the rooted `Value` tree (`{args.*, context.*, agent.*}`) that
    /// `Condition` evaluation resolves attribute paths against.
    pub fn as_condition_root(&self, agent_role: &str) -> Value {
        let args = Value::from_json(&serde_json::to_value(&self.arguments).unwrap_or_default());
        let context =
            Value::from_json(&serde_json::to_value(&self.context).unwrap_or_default());
        let mut agent_map = std::collections::BTreeMap::new();
        agent_map.insert("id".to_string(), Value::String(self.agent_id.clone()));
        agent_map.insert("role".to_string(), Value::String(agent_role.to_string()));
        Value::rooted(args, context, Value::Map(agent_map))
    }

    /// A single string field that path-traversal / destructive-pattern
    /// checks scan, pulled from whichever argument looks path- or
    /// query-shaped. Connectors are free to be more specific; this
    /// fallback keeps the mandatory safety screen usable without a schema.
    pub fn scannable_text(&self) -> String {
        self.arguments
            .values()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let req = ExecutionRequest::new("agent-1", ActionType::FileRead, "fs")
            .with_argument("path", serde_json::json!("fs://workspace/a.txt"))
            .with_context("user_verified", serde_json::json!(true));
        assert_eq!(req.agent_id, "agent-1");
        assert_eq!(req.tool_name, "fs");
        assert_eq!(
            req.arguments.get("path"),
            Some(&serde_json::json!("fs://workspace/a.txt"))
        );
    }

    #[test]
    fn condition_root_resolves_expected_paths() {
        let req = ExecutionRequest::new("agent-1", ActionType::ToolCallGeneric, "refund")
            .with_argument("amount", serde_json::json!(100))
            .with_context("user_verified", serde_json::json!(true));
        let root = req.as_condition_root("support");
        assert_eq!(root.resolve_path("args.amount"), Some(&Value::Int(100)));
        assert_eq!(
            root.resolve_path("context.user_verified"),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            root.resolve_path("agent.role"),
            Some(&Value::String("support".to_string()))
        );
    }

    #[test]
    fn scannable_text_joins_string_arguments() {
        let req = ExecutionRequest::new("agent-1", ActionType::CodeExecution, "db")
            .with_argument("query", serde_json::json!("DROP TABLE users"))
            .with_argument("count", serde_json::json!(5));
        assert_eq!(req.scannable_text(), "DROP TABLE users");
    }

    #[test]
    fn serialization_round_trip() {
        let req = ExecutionRequest::new("agent-1", ActionType::ApiCall, "web")
            .with_argument("url", serde_json::json!("https://example.com"));
        let json = serde_json::to_string(&req).unwrap();
        let restored: ExecutionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, req.id);
        assert_eq!(restored.agent_id, req.agent_id);
        assert_eq!(restored.action_type, req.action_type);
    }
}
