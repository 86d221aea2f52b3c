// config.rs — Policy YAML loader (spec §6).
//
// `serde_yaml` deserializes the typed document; a manual recursive pass
// over the raw `serde_yaml::Value` tree catches unknown keys at any
// nesting level and reports the offending dotted path, since serde's own
// `deny_unknown_fields` error does not carry full path context.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::rules::{ConditionalPermission, PolicyRule, ResourceQuota, RiskPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub version: String,
    #[serde(default)]
    pub agent_constraints: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub conditional_permissions: BTreeMap<String, Vec<ConditionalPermission>>,
    #[serde(default)]
    pub quotas: BTreeMap<String, ResourceQuota>,
    #[serde(default)]
    pub risk_policies: BTreeMap<String, RiskPolicy>,
    #[serde(default)]
    pub custom_rules: Vec<PolicyRule>,
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "version",
    "agent_constraints",
    "conditional_permissions",
    "quotas",
    "risk_policies",
    "custom_rules",
];

const QUOTA_KEYS: &[&str] = &[
    "max_requests_per_minute",
    "max_requests_per_hour",
    "max_execution_time_seconds",
    "max_concurrent_executions",
    "allowed_action_types",
];

const RISK_POLICY_KEYS: &[&str] = &[
    "max_risk_score",
    "require_approval_above",
    "deny_above",
    "high_risk_patterns",
    "allowed_domains",
    "blocked_domains",
];

const CONDITIONAL_PERMISSION_KEYS: &[&str] =
    &["tool_name", "conditions", "require_all", "resource_pattern"];
const CONDITION_KEYS: &[&str] = &["attribute_path", "operator", "value"];
const CUSTOM_RULE_KEYS: &[&str] = &[
    "rule_id",
    "name",
    "description",
    "action_types",
    "predicate",
    "effect",
    "priority",
];

pub fn load_file(path: impl AsRef<Path>) -> Result<PolicyConfig, PolicyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PolicyError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&text)
}

pub fn load_str(yaml: &str) -> Result<PolicyConfig, PolicyError> {
    let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    validate_known_keys(&raw)?;
    let config: PolicyConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}

fn validate_known_keys(raw: &serde_yaml::Value) -> Result<(), PolicyError> {
    let Some(top) = raw.as_mapping() else {
        return Err(PolicyError::ConfigError {
            path: "$".to_string(),
            message: "policy document must be a mapping".to_string(),
        });
    };

    for (key, value) in top {
        let key_str = key.as_str().unwrap_or("<non-string-key>");
        if !TOP_LEVEL_KEYS.contains(&key_str) {
            return Err(unknown_key(key_str, "$"));
        }
        match key_str {
            "agent_constraints" => { /* map<string, list<string>>, no nested schema to check */ }
            "conditional_permissions" => check_role_map(value, CONDITIONAL_PERMISSION_KEYS, "conditional_permissions", true)?,
            "quotas" => check_role_map(value, QUOTA_KEYS, "quotas", false)?,
            "risk_policies" => check_role_map(value, RISK_POLICY_KEYS, "risk_policies", false)?,
            "custom_rules" => check_list(value, CUSTOM_RULE_KEYS, "custom_rules")?,
            _ => {}
        }
    }
    Ok(())
}

fn unknown_key(key: &str, path: &str) -> PolicyError {
    PolicyError::ConfigError {
        path: format!("{}.{}", path, key),
        message: format!("unknown key '{}'", key),
    }
}

fn check_role_map(
    value: &serde_yaml::Value,
    allowed_keys: &[&str],
    path: &str,
    list_valued: bool,
) -> Result<(), PolicyError> {
    let Some(map) = value.as_mapping() else {
        return Ok(());
    };
    for (role_key, role_value) in map {
        let role = role_key.as_str().unwrap_or("<non-string-key>");
        let role_path = format!("{}.{}", path, role);
        if list_valued {
            check_list(role_value, allowed_keys, &role_path)?;
        } else {
            check_object(role_value, allowed_keys, &role_path)?;
        }
    }
    Ok(())
}

fn check_list(value: &serde_yaml::Value, allowed_keys: &[&str], path: &str) -> Result<(), PolicyError> {
    let Some(items) = value.as_sequence() else {
        return Ok(());
    };
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        check_object(item, allowed_keys, &item_path)?;
        if let Some(obj) = item.as_mapping() {
            if let Some(conditions) = obj.get(serde_yaml::Value::String("conditions".to_string())) {
                check_list(conditions, CONDITION_KEYS, &format!("{}.conditions", item_path))?;
            }
        }
    }
    Ok(())
}

fn check_object(value: &serde_yaml::Value, allowed_keys: &[&str], path: &str) -> Result<(), PolicyError> {
    let Some(obj) = value.as_mapping() else {
        return Ok(());
    };
    for (key, _) in obj {
        let key_str = key.as_str().unwrap_or("<non-string-key>");
        if !allowed_keys.contains(&key_str) {
            return Err(unknown_key(key_str, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_document() {
        let yaml = r#"
version: "1.0"
agent_constraints:
  support: ["fs", "db"]
"#;
        let config = load_str(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.agent_constraints["support"], vec!["fs", "db"]);
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let yaml = r#"
version: "1.0"
bogus_key: true
"#;
        let err = load_str(yaml).unwrap_err();
        match err {
            PolicyError::ConfigError { path, .. } => assert_eq!(path, "$.bogus_key"),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_nested_quota_key() {
        let yaml = r#"
version: "1.0"
quotas:
  support:
    max_requests_per_minutee: 5
"#;
        let err = load_str(yaml).unwrap_err();
        match err {
            PolicyError::ConfigError { path, .. } => {
                assert_eq!(path, "quotas.support.max_requests_per_minutee")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_key_inside_conditional_permission() {
        let yaml = r#"
version: "1.0"
conditional_permissions:
  support:
    - tool_name: "refund"
      bogus: true
      conditions: []
"#;
        let err = load_str(yaml).unwrap_err();
        match err {
            PolicyError::ConfigError { path, .. } => {
                assert_eq!(path, "conditional_permissions.support[0].bogus")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn loads_full_document() {
        let yaml = r#"
version: "1.0"
agent_constraints:
  support: ["refund"]
conditional_permissions:
  support:
    - tool_name: "refund"
      require_all: true
      conditions:
        - attribute_path: "args.amount"
          operator: "lt"
          value: 500
quotas:
  support:
    max_requests_per_minute: 10
risk_policies:
  default:
    max_risk_score: 1.0
    require_approval_above: 0.6
    deny_above: 0.9
custom_rules:
  - rule_id: "safety.no_destructive_sql"
    name: "Block destructive SQL"
    description: "Blocks DROP/TRUNCATE"
    action_types: ["database_write"]
    predicate:
      attribute_path: "args.query"
      operator: "matches"
      value: "DROP"
    effect: "deny"
    priority: 100
"#;
        let config = load_str(yaml).unwrap();
        assert_eq!(config.conditional_permissions["support"].len(), 1);
        assert_eq!(config.quotas["support"].max_requests_per_minute, Some(10));
        assert_eq!(config.custom_rules.len(), 1);
        assert_eq!(config.custom_rules[0].priority, 100);
    }
}
