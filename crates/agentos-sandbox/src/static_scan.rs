// static_scan.rs — Lexical static scan for blocked symbols/imports.
//
// Not a real AST walk: no parser crate is in the precedent's dependency
// stack, and introducing one to support a single sandbox crate would
// violate keeping the dependency stack aligned with the precedent. The
// static phase is therefore regex-based line scanning over blocked
// symbol names and import-statement shapes — a deliberate simplification,
// named here rather than left implicit.

use regex::Regex;

use crate::config::SandboxConfig;
use crate::violation::SandboxViolation;

/// Matches a dynamic-import call shape: `import(...)` or `__import__(...)`.
fn dynamic_import_pattern() -> Regex {
    Regex::new(r"\b(import\s*\(|__import__\s*\()").expect("valid dynamic import pattern")
}

fn symbol_pattern(symbol: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\s*\(", regex::escape(symbol))).ok()
}

/// Scan source text line by line and report every blocked symbol or
/// import reference found. Returns violations in line order; callers
/// treat a non-empty result as a static-phase DENY (spec §4.4).
pub fn scan_source(code: &str, config: &SandboxConfig) -> Vec<SandboxViolation> {
    let mut violations = Vec::new();
    let symbol_patterns: Vec<(String, Regex)> = config
        .blocked_symbols
        .iter()
        .filter_map(|s| symbol_pattern(s).map(|re| (s.clone(), re)))
        .collect();
    let import_patterns: Vec<Regex> = config
        .blocked_import_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();
    let dynamic_import = dynamic_import_pattern();

    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        for (symbol, pattern) in &symbol_patterns {
            if pattern.is_match(line) {
                violations.push(SandboxViolation::blocked_symbol(line_no, symbol.clone()));
            }
        }
        if dynamic_import.is_match(line) {
            violations.push(SandboxViolation::blocked_symbol(line_no, "dynamic_import"));
        }
        for pattern in &import_patterns {
            if let Some(m) = pattern.find(line) {
                violations.push(SandboxViolation::blocked_import(line_no, m.as_str().to_string()));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_eval_call() {
        let violations = scan_source("x = eval(user_input)", &SandboxConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 1);
    }

    #[test]
    fn detects_dynamic_import() {
        let violations = scan_source("const mod = import(\"fs\")", &SandboxConfig::default());
        assert!(!violations.is_empty());
    }

    #[test]
    fn detects_blocked_subprocess_import() {
        let violations = scan_source("import subprocess", &SandboxConfig::default());
        assert!(!violations.is_empty());
    }

    #[test]
    fn detects_socket_reference() {
        let violations = scan_source("let s = net::TcpStream::connect(addr);", &SandboxConfig::default());
        assert!(!violations.is_empty());
    }

    #[test]
    fn reports_the_correct_line_number() {
        let code = "line one\nline two\ny = eval(z)\n";
        let violations = scan_source(code, &SandboxConfig::default());
        assert_eq!(violations[0].line, 3);
    }

    #[test]
    fn clean_code_has_no_violations() {
        let violations = scan_source("fn add(a: i32, b: i32) -> i32 { a + b }", &SandboxConfig::default());
        assert!(violations.is_empty());
    }

    #[test]
    fn eval_as_substring_of_identifier_does_not_match() {
        let violations = scan_source("evaluation_score(x)", &SandboxConfig::default());
        assert!(violations.is_empty());
    }
}
