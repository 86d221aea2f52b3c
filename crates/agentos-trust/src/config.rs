// config.rs — Sidecar YAML configuration (spec §6 config conventions),
// mirroring the policy engine's `load_str`/`load_file` loader shape.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TrustError;
use crate::manifest::CapabilityManifest;

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_backend_timeout_ms() -> u64 {
    5_000
}

fn default_scan_email_phone() -> bool {
    false
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout_seconds() -> u64 {
    30
}

fn default_half_open_max_calls() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    pub backend_url: String,
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
    #[serde(default = "default_scan_email_phone")]
    pub scan_email_phone: bool,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_reset_timeout_seconds")]
    pub reset_timeout_seconds: u64,
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
    pub manifest: CapabilityManifest,
}

impl TrustConfig {
    pub fn load_str(raw: &str) -> Result<Self, TrustError> {
        serde_yaml::from_str(raw).map_err(|e| TrustError::Internal(format!("invalid trust config: {e}")))
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, TrustError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TrustError::Internal(format!("cannot read trust config: {e}")))?;
        Self::load_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
backend_url: "http://127.0.0.1:9000"
manifest:
  agent_id: "agent-1"
  version: "1.0"
  trust_level: trusted
  reversibility: full
  undo_window_seconds: 3600
  sla_latency_ms: 250
  retention: ephemeral
  storage_location: local
  human_review: false
  capabilities: []
"#;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let config = TrustConfig::load_str(SAMPLE).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8787");
        assert_eq!(config.backend_url, "http://127.0.0.1:9000");
        assert!(!config.scan_email_phone);
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(TrustConfig::load_str("not: [valid").is_err());
    }
}
