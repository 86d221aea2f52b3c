// sandbox.rs — Sandbox: wires the static scan, runtime hook, and resource
// budget together (spec §4.4).

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use agentos_primitives::SignalKind;
use agentos_signal::{Signal, SignalDispatcher};

use crate::budget::{BudgetKind, SandboxBudget};
use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::runtime::ImportGuard;
use crate::static_scan::scan_source;
use crate::violation::SandboxViolation;

pub struct Sandbox {
    config: SandboxConfig,
    signals: Option<SignalDispatcher>,
}

/// Result of a single-step shadow run: static scan only, no side effects,
/// no closure invocation (spec §9: shadow mode is single-step only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowResult {
    pub status: String,
    pub would_have_signalled: Vec<SignalKind>,
    pub violations: Vec<SandboxViolation>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig, signals: Option<SignalDispatcher>) -> Self {
        Self { config, signals }
    }

    /// Run `code` through the static scan, then hand an `ImportGuard` to
    /// `f` so it can re-check every import it attempts at call time. `f`
    /// is the caller's model of "running the code" — this crate has no
    /// interpreter of its own, so it governs whatever execution strategy
    /// the caller provides.
    pub fn execute<F, T>(&self, agent_id: &str, code: &str, f: F) -> Result<T, SandboxError>
    where
        F: FnOnce(&ImportGuard) -> Result<T, SandboxError> + std::panic::UnwindSafe,
    {
        if self.config.shadow_mode {
            panic!("execute() called on a sandbox configured for shadow_mode; use execute_shadow");
        }

        if let Some(violation) = scan_source(code, &self.config).into_iter().next() {
            return Err(SandboxError::StaticViolation(violation));
        }

        let guard = ImportGuard::install(&self.config.blocked_import_patterns);
        let start = Instant::now();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| f(&guard)));
        drop(guard);
        let elapsed = start.elapsed();

        if let Some(max_wall) = self.config.limits.max_wall_seconds {
            if elapsed.as_secs() > max_wall {
                let budget = SandboxBudget {
                    kind: BudgetKind::Wall,
                    limit_seconds: max_wall,
                    actual_seconds: elapsed.as_secs(),
                };
                if let Some(dispatcher) = &self.signals {
                    let _ = dispatcher.send(agent_id, Signal::new(SignalKind::Sigbudget, "sandbox"));
                }
                return Err(SandboxError::BudgetExceeded(budget));
            }
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(SandboxError::Panicked),
        }
    }

    /// Single-step shadow run: static scan only, never executes `code`
    /// and never raises a real signal (spec §9).
    pub fn execute_shadow(&self, code: &str) -> ShadowResult {
        let violations = scan_source(code, &self.config);
        let would_have_signalled = if violations.is_empty() {
            Vec::new()
        } else {
            vec![SignalKind::Sigpolicy]
        };
        ShadowResult {
            status: "simulated".to_string(),
            would_have_signalled,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::ResourceLimits;

    #[test]
    fn static_violation_blocks_before_execution() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let mut ran = false;
        let result = sandbox.execute("agent-1", "x = eval(y)", |_guard| {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
    }

    #[test]
    fn clean_code_runs_the_closure() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let result = sandbox.execute("agent-1", "fn f() {}", |_guard| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn runtime_hook_denies_blocked_import_at_call_time() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let result: Result<(), SandboxError> = sandbox.execute("agent-1", "fn f() {}", |guard| {
            guard.check_import("subprocess")
        });
        assert!(matches!(result, Err(SandboxError::RuntimeViolation(_))));
    }

    #[test]
    fn panicking_closure_is_caught() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let result: Result<(), SandboxError> =
            sandbox.execute("agent-1", "fn f() {}", |_guard| panic!("boom"));
        assert!(matches!(result, Err(SandboxError::Panicked)));
    }

    #[test]
    fn wall_budget_exceeded_raises_sigbudget() {
        let config = SandboxConfig {
            limits: ResourceLimits {
                max_wall_seconds: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let dispatcher = SignalDispatcher::new();
        dispatcher.register_agent("agent-1");
        let sandbox = Sandbox::new(config, Some(dispatcher));
        let result: Result<(), SandboxError> = sandbox.execute("agent-1", "fn f() {}", |_guard| {
            std::thread::sleep(std::time::Duration::from_millis(1100));
            Ok(())
        });
        assert!(matches!(result, Err(SandboxError::BudgetExceeded(_))));
    }

    #[test]
    fn shadow_run_never_executes_and_reports_violations() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let result = sandbox.execute_shadow("x = eval(y)");
        assert_eq!(result.status, "simulated");
        assert!(!result.would_have_signalled.is_empty());
        assert!(!result.violations.is_empty());
    }

    #[test]
    fn shadow_run_on_clean_code_signals_nothing() {
        let sandbox = Sandbox::new(SandboxConfig::default(), None);
        let result = sandbox.execute_shadow("fn f() {}");
        assert!(result.would_have_signalled.is_empty());
    }
}
