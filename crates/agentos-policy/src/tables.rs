// tables.rs — In-memory policy tables, built from a loaded `PolicyConfig`.
//
// Owned exclusively by the `PolicyEngine`; mutated only through its API
// (spec §3 lifecycle note) — never shared mutably across threads.

use std::collections::{BTreeSet, HashMap};

use crate::config::PolicyConfig;
use crate::rules::{ConditionalPermission, PolicyRule, ResourceQuota, RiskPolicy};

#[derive(Debug, Clone, Default)]
pub struct PolicyTables {
    pub allow_list: HashMap<String, BTreeSet<String>>,
    pub conditional_permissions: HashMap<String, Vec<ConditionalPermission>>,
    pub quotas: HashMap<String, ResourceQuota>,
    pub risk_policies: HashMap<String, RiskPolicy>,
    /// Insertion order preserved — ties break by this order (spec §4.1).
    pub custom_rules: Vec<PolicyRule>,
}

impl PolicyTables {
    pub fn from_config(config: PolicyConfig) -> Self {
        let allow_list = config
            .agent_constraints
            .into_iter()
            .map(|(role, tools)| (role, tools.into_iter().collect()))
            .collect();

        let mut custom_rules = config.custom_rules;
        // Descending priority; stable sort preserves insertion order on ties.
        custom_rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self {
            allow_list,
            conditional_permissions: config.conditional_permissions.into_iter().collect(),
            quotas: config.quotas.into_iter().collect(),
            risk_policies: config.risk_policies.into_iter().collect(),
            custom_rules,
        }
    }

    /// The default risk policy used when a role names none explicitly —
    /// every role shares the `"default"` entry if present, else a
    /// permissive-but-bounded fallback.
    pub fn risk_policy_for(&self, role: &str) -> RiskPolicy {
        self.risk_policies
            .get(role)
            .or_else(|| self.risk_policies.get("default"))
            .cloned()
            .unwrap_or_default()
    }

    pub fn quota_for(&self, role: &str) -> ResourceQuota {
        self.quotas.get(role).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_str;

    #[test]
    fn custom_rules_sort_by_descending_priority_stable() {
        let yaml = r#"
version: "1.0"
custom_rules:
  - rule_id: "a"
    name: "a"
    description: ""
    action_types: ["file_read"]
    predicate: {attribute_path: "x", operator: "eq", value: 1}
    effect: "deny"
    priority: 10
  - rule_id: "b"
    name: "b"
    description: ""
    action_types: ["file_read"]
    predicate: {attribute_path: "x", operator: "eq", value: 1}
    effect: "deny"
    priority: 50
  - rule_id: "c"
    name: "c"
    description: ""
    action_types: ["file_read"]
    predicate: {attribute_path: "x", operator: "eq", value: 1}
    effect: "deny"
    priority: 50
"#;
        let tables = PolicyTables::from_config(load_str(yaml).unwrap());
        let ids: Vec<&str> = tables.custom_rules.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn risk_policy_falls_back_to_default_then_permissive() {
        let yaml = r#"
version: "1.0"
risk_policies:
  default:
    max_risk_score: 1.0
    require_approval_above: 0.4
    deny_above: 0.9
"#;
        let tables = PolicyTables::from_config(load_str(yaml).unwrap());
        assert_eq!(tables.risk_policy_for("support").require_approval_above, 0.4);
        assert_eq!(tables.risk_policy_for("unknown-role").require_approval_above, 0.4);

        let empty = PolicyTables::default();
        assert_eq!(empty.risk_policy_for("anything").deny_above, RiskPolicy::default().deny_above);
    }
}
