// check.rs — Static sandbox scan over source files (spec §6 `check`).

use std::io::BufRead;
use std::path::PathBuf;

use agentos_sandbox::{scan_source, SandboxConfig};
use serde::Serialize;

use crate::ExitCode;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct FileReport {
    path: String,
    violations: Vec<agentos_sandbox::SandboxViolation>,
}

pub fn execute(files: &[PathBuf], staged: bool, ci: bool, format: Format) -> anyhow::Result<ExitCode> {
    let mut targets = files.to_vec();
    if staged {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            if !line.trim().is_empty() {
                targets.push(PathBuf::from(line.trim()));
            }
        }
    }

    if targets.is_empty() {
        anyhow::bail!("no files to check (pass paths or --staged)");
    }

    let config = SandboxConfig::default();
    let mut reports = Vec::with_capacity(targets.len());
    let mut any_violation = false;

    for path in &targets {
        let code = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let violations = scan_source(&code, &config);
        if !violations.is_empty() {
            any_violation = true;
        }
        if ci {
            println!("{}: {} violation(s)", path.display(), violations.len());
        }
        reports.push(FileReport { path: path.display().to_string(), violations });
    }

    if !ci {
        match format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            Format::Text => {
                for report in &reports {
                    if report.violations.is_empty() {
                        println!("{}: clean", report.path);
                        continue;
                    }
                    println!("{}:", report.path);
                    for v in &report.violations {
                        println!("  line {}: {:?} ({})", v.line, v.kind, v.symbol);
                    }
                }
            }
        }
    }

    Ok(if any_violation { ExitCode::ViolationFound } else { ExitCode::Success })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_file_exits_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.py");
        std::fs::write(&path, "x = 1 + 1\n").unwrap();
        let code = execute(&[path], false, false, Format::Text).unwrap();
        assert!(matches!(code, ExitCode::Success));
    }

    #[test]
    fn blocked_symbol_exits_violation_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.py");
        std::fs::write(&path, "eval(payload)\n").unwrap();
        let code = execute(&[path], false, false, Format::Json).unwrap();
        assert!(matches!(code, ExitCode::ViolationFound));
    }
}
