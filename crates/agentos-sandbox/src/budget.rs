// budget.rs — Resource limits and the budget-exceeded event (spec §4.4).
//
// Memory and CPU accounting require a real process boundary this crate
// doesn't have; `max_memory_mb`/`max_cpu_seconds` are accepted and
// validated but only `max_wall_seconds` is actually enforced, measured
// around the closure `Sandbox::execute` runs. This is a named
// simplification, not a silent gap.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceLimits {
    #[serde(default)]
    pub max_memory_mb: Option<u64>,
    #[serde(default)]
    pub max_cpu_seconds: Option<u64>,
    #[serde(default)]
    pub max_wall_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    Memory,
    Cpu,
    Wall,
}

/// Raised when an execution exceeds one of its `ResourceLimits`. The
/// signal subsystem maps this to `SIGBUDGET` (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxBudget {
    pub kind: BudgetKind,
    pub limit_seconds: u64,
    pub actual_seconds: u64,
}

impl std::fmt::Display for SandboxBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            BudgetKind::Memory => "memory",
            BudgetKind::Cpu => "cpu",
            BudgetKind::Wall => "wall",
        };
        write!(
            f,
            "{} budget exceeded: {}s actual > {}s limit",
            kind, self.actual_seconds, self.limit_seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_unbounded() {
        let limits = ResourceLimits::default();
        assert!(limits.max_wall_seconds.is_none());
    }

    #[test]
    fn display_names_the_exceeded_kind() {
        let budget = SandboxBudget {
            kind: BudgetKind::Wall,
            limit_seconds: 5,
            actual_seconds: 9,
        };
        assert!(budget.to_string().contains("wall"));
    }
}
