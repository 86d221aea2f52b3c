// validate.rs — Parse & type-check policy documents (spec §6 `validate`).

use std::path::{Path, PathBuf};

use agentos_policy::PolicyConfig;

use crate::ExitCode;

pub fn execute(state_root: &Path, files: &[PathBuf], strict: bool) -> anyhow::Result<ExitCode> {
    let targets = if files.is_empty() {
        vec![state_root.join("policy").join("active.yaml")]
    } else {
        files.to_vec()
    };

    let mut failed = false;
    for path in &targets {
        match agentos_policy::load_file(path) {
            Ok(config) => {
                let warnings = if strict { advisory_warnings(&config) } else { Vec::new() };
                if warnings.is_empty() {
                    println!("{}: OK", path.display());
                } else {
                    failed = true;
                    println!("{}: {} advisory finding(s)", path.display(), warnings.len());
                    for w in &warnings {
                        println!("  - {w}");
                    }
                }
            }
            Err(err) => {
                failed = true;
                println!("{}: {err}", path.display());
            }
        }
    }

    Ok(if failed { ExitCode::ViolationFound } else { ExitCode::Success })
}

/// Findings that load successfully but look like mistakes: out-of-range
/// risk thresholds and a risk policy with no room for any requests to
/// pass (`deny_above <= require_approval_above`).
fn advisory_warnings(config: &PolicyConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    for (role, policy) in &config.risk_policies {
        if !(0.0..=1.0).contains(&policy.max_risk_score) {
            warnings.push(format!("risk_policies.{role}.max_risk_score out of [0,1]: {}", policy.max_risk_score));
        }
        if policy.deny_above <= policy.require_approval_above {
            warnings.push(format!(
                "risk_policies.{role}: deny_above ({}) <= require_approval_above ({}) leaves no warn band",
                policy.deny_above, policy.require_approval_above
            ));
        }
    }
    for rule in &config.custom_rules {
        if rule.applies_to.is_empty() {
            warnings.push(format!("custom_rules.{}: action_types is empty, rule never applies", rule.rule_id));
        }
    }
    warnings
}
