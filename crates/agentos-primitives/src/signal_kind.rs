// signal_kind.rs — Lifecycle signal vocabulary (spec §4.2).
//
// Kept in `agentos-primitives` because both the policy engine (which
// decides to raise SIGPOLICY) and the audit log (which records signals
// alongside decisions) need the vocabulary without depending on the full
// dispatcher in `agentos-signal`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Sigstop,
    Sigcont,
    Sigint,
    Sigkill,
    Sigterm,
    Sigusr1,
    Sigusr2,
    Sigpolicy,
    Sigtrust,
    Sigbudget,
    Sigloop,
    Sigdrift,
}

impl SignalKind {
    /// The POSIX-style signal number from spec §4.2's table.
    pub fn number(self) -> u8 {
        match self {
            SignalKind::Sigstop => 1,
            SignalKind::Sigcont => 2,
            SignalKind::Sigint => 3,
            SignalKind::Sigkill => 4,
            SignalKind::Sigterm => 5,
            SignalKind::Sigusr1 => 6,
            SignalKind::Sigusr2 => 7,
            SignalKind::Sigpolicy => 8,
            SignalKind::Sigtrust => 9,
            SignalKind::Sigbudget => 10,
            SignalKind::Sigloop => 11,
            SignalKind::Sigdrift => 12,
        }
    }

    /// `true` if this signal can never be masked, caught, or delayed.
    pub fn is_unmaskable(self) -> bool {
        matches!(
            self,
            SignalKind::Sigkill | SignalKind::Sigpolicy | SignalKind::Sigtrust
        )
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalKind::Sigstop => "SIGSTOP",
            SignalKind::Sigcont => "SIGCONT",
            SignalKind::Sigint => "SIGINT",
            SignalKind::Sigkill => "SIGKILL",
            SignalKind::Sigterm => "SIGTERM",
            SignalKind::Sigusr1 => "SIGUSR1",
            SignalKind::Sigusr2 => "SIGUSR2",
            SignalKind::Sigpolicy => "SIGPOLICY",
            SignalKind::Sigtrust => "SIGTRUST",
            SignalKind::Sigbudget => "SIGBUDGET",
            SignalKind::Sigloop => "SIGLOOP",
            SignalKind::Sigdrift => "SIGDRIFT",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmaskable_set_matches_spec_table() {
        assert!(SignalKind::Sigkill.is_unmaskable());
        assert!(SignalKind::Sigpolicy.is_unmaskable());
        assert!(SignalKind::Sigtrust.is_unmaskable());
        assert!(!SignalKind::Sigstop.is_unmaskable());
        assert!(!SignalKind::Sigbudget.is_unmaskable());
    }

    #[test]
    fn numbers_match_spec_table() {
        assert_eq!(SignalKind::Sigstop.number(), 1);
        assert_eq!(SignalKind::Sigkill.number(), 4);
        assert_eq!(SignalKind::Sigdrift.number(), 12);
    }

    #[test]
    fn display_uses_posix_style_name() {
        assert_eq!(SignalKind::Sigkill.to_string(), "SIGKILL");
    }
}
