// status.rs — Print kernel version and loaded policy summary (spec §6 `status`).

use std::path::Path;

use agentos_audit::FlightRecorder;

use crate::ExitCode;

pub fn execute(state_root: &Path) -> anyhow::Result<ExitCode> {
    println!("agentos-kernel {}", env!("CARGO_PKG_VERSION"));
    println!("state root: {}", state_root.display());

    let policy_path = std::env::var_os("AGENTOS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| state_root.join("policy").join("active.yaml"));

    if !policy_path.exists() {
        println!("policy: not found at {}", policy_path.display());
        return Ok(ExitCode::ConfigError);
    }

    let config = agentos_policy::load_file(&policy_path)?;
    println!("policy: {} (version {})", policy_path.display(), config.version);
    println!("  agent_constraints:      {}", config.agent_constraints.len());
    println!("  conditional_permissions: {}", config.conditional_permissions.len());
    println!("  quotas:                 {}", config.quotas.len());
    println!("  risk_policies:          {}", config.risk_policies.len());
    println!("  custom_rules:           {}", config.custom_rules.len());

    let recorder_dir = std::env::var_os("AGENTOS_RECORDER_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| state_root.join("recorder"));

    if recorder_dir.exists() {
        match FlightRecorder::verify_integrity(&recorder_dir) {
            Ok(None) => println!("recorder: {} (hash chain intact)", recorder_dir.display()),
            Ok(Some(seq)) => {
                println!("recorder: {} (INTEGRITY VIOLATION at seq {seq})", recorder_dir.display());
                return Ok(ExitCode::RuntimeError);
            }
            Err(err) => println!("recorder: {} (unreadable: {err})", recorder_dir.display()),
        }
    } else {
        println!("recorder: not yet created at {}", recorder_dir.display());
    }

    Ok(ExitCode::Success)
}
