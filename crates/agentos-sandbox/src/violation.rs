// violation.rs — SandboxViolation: what the static/runtime scan reports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A blocked symbol (`eval`, `exec`, `compile`, dynamic import) referenced directly.
    BlockedSymbol,
    /// An import/require of a blocked module.
    BlockedImport,
}

/// A single static or runtime sandbox finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxViolation {
    pub kind: ViolationKind,
    /// 1-indexed source line the violation was found on. `0` for
    /// runtime-phase violations, which have no static line to point to.
    pub line: usize,
    pub symbol: String,
}

impl SandboxViolation {
    pub fn blocked_symbol(line: usize, symbol: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::BlockedSymbol,
            line,
            symbol: symbol.into(),
        }
    }

    pub fn blocked_import(line: usize, symbol: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::BlockedImport,
            line,
            symbol: symbol.into(),
        }
    }
}
