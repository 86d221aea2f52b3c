// safety.rs — The mandatory safety screen (spec §4.1 step 1).
//
// Always active, never configurable off: path traversal, destructive
// command patterns in CODE_EXECUTION, and SQL sanitation on DATABASE_*.

use glob::Pattern;
use regex::Regex;
use std::sync::OnceLock;

use agentos_primitives::ActionType;

const SYSTEM_PREFIXES: &[&str] = &["/etc/", "/sys/", "/proc/", "/dev/", "C:\\Windows\\"];

/// A single reason the mandatory safety screen blocked a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyViolation {
    pub rule: &'static str,
    pub detail: String,
}

/// Detect path traversal (`..`) or a resolved system path prefix in any
/// path-shaped string. Checks the raw string, not a normalized path, to
/// catch encoding tricks.
pub fn contains_path_traversal(text: &str) -> Option<SafetyViolation> {
    if text.contains("..") || text.contains("%2e%2e") || text.contains("%2E%2E") {
        return Some(SafetyViolation {
            rule: "safety.no_path_traversal",
            detail: format!("path traversal detected in '{}'", text),
        });
    }
    for prefix in SYSTEM_PREFIXES {
        if text.contains(prefix) {
            return Some(SafetyViolation {
                rule: "safety.no_system_path",
                detail: format!("reference to system path prefix '{}'", prefix),
            });
        }
    }
    None
}

fn destructive_command_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)rm\s+-rf|\bformat\b|\bdrop\s+(table|database)\b|\btruncate\s+table\b|\bdelete\s+from\b(?!.*\bwhere\b)")
            .unwrap()
    })
}

/// Destructive command patterns for `CODE_EXECUTION` (spec §4.1 step 1).
pub fn contains_destructive_command(text: &str) -> Option<SafetyViolation> {
    if destructive_command_pattern().is_match(text) {
        Some(SafetyViolation {
            rule: "safety.no_destructive_command",
            detail: "destructive command pattern detected".to_string(),
        })
    } else {
        None
    }
}

fn sql_comment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(--[^\n]*)|(/\*.*?\*/)").unwrap())
}

fn stacked_statement_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r";\s*\S").unwrap())
}

/// SQL sanitation for `DATABASE_*` actions: detect stacked statements after
/// stripping comments for pattern matching only — the query itself is never
/// rewritten (spec §4.1 step 1).
pub fn contains_unsafe_sql(query: &str) -> Option<SafetyViolation> {
    let stripped = sql_comment_pattern().replace_all(query, "");
    if destructive_command_pattern().is_match(&stripped) {
        return Some(SafetyViolation {
            rule: "safety.no_destructive_sql",
            detail: "destructive SQL pattern detected".to_string(),
        });
    }
    let trimmed = stripped.trim().trim_end_matches(';');
    if stacked_statement_pattern().is_match(trimmed) {
        return Some(SafetyViolation {
            rule: "safety.no_stacked_statements",
            detail: "stacked SQL statements detected".to_string(),
        });
    }
    None
}

/// Match a resource glob pattern against a target path/URI. Invalid
/// patterns never match — fail-closed, not fail-open.
pub fn matches_resource_pattern(pattern: &str, target: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(target),
        Err(_) => false,
    }
}

/// Run the full mandatory safety screen over a request's scannable text,
/// dispatching to the SQL-specific check for `DATABASE_*` action types.
pub fn mandatory_safety_screen(action_type: ActionType, text: &str) -> Option<SafetyViolation> {
    if let Some(v) = contains_path_traversal(text) {
        return Some(v);
    }
    match action_type {
        ActionType::CodeExecution => contains_destructive_command(text),
        ActionType::DatabaseQuery | ActionType::DatabaseWrite => contains_unsafe_sql(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dotdot_traversal() {
        assert!(contains_path_traversal("fs://workspace/../etc/passwd").is_some());
    }

    #[test]
    fn detects_encoded_traversal() {
        assert!(contains_path_traversal("fs://workspace/%2e%2e/etc").is_some());
    }

    #[test]
    fn detects_system_prefix() {
        assert!(contains_path_traversal("/etc/passwd").is_some());
    }

    #[test]
    fn clean_path_passes() {
        assert!(contains_path_traversal("fs://workspace/src/main.rs").is_none());
    }

    #[test]
    fn detects_rm_rf() {
        assert!(contains_destructive_command("rm -rf /").is_some());
    }

    #[test]
    fn detects_drop_table() {
        assert!(contains_unsafe_sql("DROP TABLE users").is_some());
    }

    #[test]
    fn detects_delete_without_where() {
        assert!(contains_unsafe_sql("DELETE FROM users").is_some());
    }

    #[test]
    fn delete_with_where_passes() {
        assert!(contains_unsafe_sql("DELETE FROM users WHERE id = 1").is_none());
    }

    #[test]
    fn detects_stacked_statements() {
        assert!(contains_unsafe_sql("SELECT 1; DROP TABLE users").is_some());
    }

    #[test]
    fn strips_comments_before_matching() {
        assert!(contains_unsafe_sql("-- comment\nDROP TABLE users").is_some());
    }

    #[test]
    fn resource_pattern_matches_glob() {
        assert!(matches_resource_pattern("fs://workspace/**", "fs://workspace/a/b.txt"));
        assert!(!matches_resource_pattern("fs://workspace/**", "fs://other/a.txt"));
    }

    #[test]
    fn invalid_resource_pattern_never_matches() {
        assert!(!matches_resource_pattern("[", "anything"));
    }

    #[test]
    fn mandatory_screen_routes_by_action_type() {
        assert!(mandatory_safety_screen(ActionType::CodeExecution, "rm -rf /tmp").is_some());
        assert!(mandatory_safety_screen(ActionType::DatabaseWrite, "DROP TABLE t").is_some());
        assert!(mandatory_safety_screen(ActionType::FileRead, "rm -rf /tmp").is_none());
    }
}
