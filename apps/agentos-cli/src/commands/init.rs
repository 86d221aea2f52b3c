// init.rs — Scaffold a kernel state root (spec §6 persisted state layout).

use std::path::Path;

use crate::ExitCode;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Template {
    /// Safety screen only; no allow-lists, quotas, or risk policies — every
    /// role may call every tool once admitted past the mandatory screen.
    Permissive,
    /// Default-deny: every role is allow-listed with an empty tool set, a
    /// conservative risk policy, and the destructive-SQL custom rule.
    Strict,
    /// Permissive plus a logging custom rule so every decision leaves an
    /// extra `Effect::Log` trail, for environments piloting the kernel
    /// before turning on enforcement.
    Audit,
}

pub fn execute(state_root: &Path, template: Template) -> anyhow::Result<ExitCode> {
    let policy_dir = state_root.join("policy");
    std::fs::create_dir_all(&policy_dir)?;
    std::fs::create_dir_all(state_root.join("recorder"))?;
    std::fs::create_dir_all(state_root.join("memory"))?;

    let active_path = policy_dir.join("active.yaml");
    if active_path.exists() {
        anyhow::bail!("{} already exists; remove it first", active_path.display());
    }

    std::fs::write(&active_path, template.document())?;
    println!("Wrote {}", active_path.display());
    println!("Initialized state root at {}", state_root.display());
    Ok(ExitCode::Success)
}

impl Template {
    fn document(self) -> &'static str {
        match self {
            Template::Permissive => PERMISSIVE,
            Template::Strict => STRICT,
            Template::Audit => AUDIT,
        }
    }
}

const PERMISSIVE: &str = r#"version: "1.0"
"#;

const STRICT: &str = r#"version: "1.0"
agent_constraints:
  default: []
risk_policies:
  default:
    max_risk_score: 1.0
    require_approval_above: 0.5
    deny_above: 0.8
custom_rules:
  - rule_id: "safety.no_destructive_sql"
    name: "Block destructive SQL"
    description: "Denies DROP/TRUNCATE/DELETE without a WHERE clause"
    action_types: ["database_write"]
    predicate:
      attribute_path: "args.query"
      operator: matches
      value: "(?i)DROP\\s+TABLE|TRUNCATE"
    effect: deny
    priority: 100
"#;

const AUDIT: &str = r#"version: "1.0"
custom_rules:
  - rule_id: "audit.log_all"
    name: "Log every decision"
    description: "Piloting rule: record every request without denying any"
    action_types: ["file_read", "file_write", "code_execution", "api_call", "database_query", "database_write", "workflow_trigger", "tool_call_generic"]
    predicate:
      attribute_path: "agent.role"
      operator: matches
      value: ".*"
    effect: log
    priority: 1
"#;
