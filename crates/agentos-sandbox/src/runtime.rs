// runtime.rs — Runtime import-interception hook (spec §4.4 runtime phase).
//
// Defence-in-depth for obfuscated static analysis: even if the static
// scan passes, every import the running code attempts is checked again
// at call time. `ImportGuard` is installed before the sandboxed closure
// runs and uninstalled by `Drop` on every exit path, including panics —
// Rust's unwind-by-default panic strategy runs destructors during stack
// unwinding, so no explicit panic bookkeeping is needed for that guarantee.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regex::Regex;

use crate::error::SandboxError;
use crate::violation::SandboxViolation;

pub struct ImportGuard {
    blocked: Vec<Regex>,
    installed: Arc<AtomicBool>,
}

impl ImportGuard {
    pub(crate) fn install(patterns: &[String]) -> Self {
        let blocked = patterns.iter().filter_map(|p| Regex::new(p).ok()).collect();
        let installed = Arc::new(AtomicBool::new(true));
        tracing::debug!("sandbox import hook installed");
        Self { blocked, installed }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Called by the sandboxed code before each import/require. DENIES at
    /// call time if the module matches a blocked pattern.
    pub fn check_import(&self, module: &str) -> Result<(), SandboxError> {
        for pattern in &self.blocked {
            if pattern.is_match(module) {
                return Err(SandboxError::RuntimeViolation(SandboxViolation::blocked_import(
                    0, module,
                )));
            }
        }
        Ok(())
    }
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.installed.store(false, Ordering::SeqCst);
        tracing::debug!("sandbox import hook uninstalled");
    }
}
