// config.rs — SandboxConfig: the blocklists and resource limits a sandboxed
// execution is evaluated against.

use serde::{Deserialize, Serialize};

use crate::budget::ResourceLimits;

/// Symbols whose direct reference is always blocked (spec §4.4): dynamic
/// evaluation and compilation primitives.
pub const DEFAULT_BLOCKED_SYMBOLS: &[&str] = &["eval", "exec", "compile", "__import__"];

/// One regex per blocked module category (spec §4.4): process/shell
/// runners, OS facilities, filesystem recursion, sockets, and FFI. Kept as
/// named regex sources rather than a single combined pattern so a single
/// category can be disabled or overridden independently.
pub const DEFAULT_BLOCKED_IMPORT_PATTERNS: &[&str] = &[
    r"\b(subprocess|child_process|std::process::Command|os\.system)\b",
    r"\b(os|sys|platform)\s*::?\s*(import|require)?\b",
    r"\b(shutil\.rmtree|fs::remove_dir_all|rm\s+-rf)\b",
    r"\b(socket|net::TcpStream|net::TcpListener)\b",
    r"\b(ctypes|libc::|ffi::)\b",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_blocked_symbols")]
    pub blocked_symbols: Vec<String>,
    #[serde(default = "default_blocked_import_patterns")]
    pub blocked_import_patterns: Vec<String>,
    #[serde(default)]
    pub limits: ResourceLimits,
    #[serde(default)]
    pub shadow_mode: bool,
}

fn default_blocked_symbols() -> Vec<String> {
    DEFAULT_BLOCKED_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_blocked_import_patterns() -> Vec<String> {
    DEFAULT_BLOCKED_IMPORT_PATTERNS.iter().map(|s| s.to_string()).collect()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            blocked_symbols: default_blocked_symbols(),
            blocked_import_patterns: default_blocked_import_patterns(),
            limits: ResourceLimits::default(),
            shadow_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_carries_spec_blocklists() {
        let config = SandboxConfig::default();
        assert!(config.blocked_symbols.contains(&"eval".to_string()));
        assert_eq!(config.blocked_import_patterns.len(), DEFAULT_BLOCKED_IMPORT_PATTERNS.len());
    }
}
