// config.rs — Kernel bootstrap configuration: where policy, recorder, and
// sandbox settings live on disk (spec §6 state layout).

use std::path::{Path, PathBuf};

use agentos_sandbox::SandboxConfig;

use crate::error::KernelError;

pub struct KernelConfig {
    pub state_root: PathBuf,
    pub policy: agentos_policy::PolicyConfig,
    pub sandbox: SandboxConfig,
}

impl KernelConfig {
    /// Load from `<state_root>/policy/active.yaml` and (if present)
    /// `<state_root>/sandbox.yaml`, falling back to `SandboxConfig::default()`.
    pub fn load(state_root: impl AsRef<Path>) -> Result<Self, KernelError> {
        let state_root = state_root.as_ref().to_path_buf();

        let policy_path = state_root.join("policy").join("active.yaml");
        let policy = agentos_policy::load_file(&policy_path)?;

        let sandbox_path = state_root.join("sandbox.yaml");
        let sandbox = if sandbox_path.exists() {
            let raw = std::fs::read_to_string(&sandbox_path)
                .map_err(|e| KernelError::Config(format!("cannot read {}: {e}", sandbox_path.display())))?;
            serde_yaml::from_str(&raw)
                .map_err(|e| KernelError::Config(format!("invalid sandbox config: {e}")))?
        } else {
            SandboxConfig::default()
        };

        Ok(Self { state_root, policy, sandbox })
    }
}
