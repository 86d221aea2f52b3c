// audit.rs — Dump recent flight recorder entries, or verify the hash
// chain (spec §6 `audit`).
//
// `FlightRecorder` only exposes per-agent lookups (`read_recent`) plus a
// static `verify_integrity`; neither gives an across-all-agents dump, so
// this walks the segment files directly, using the same
// `audit-<start>-*.log` naming convention `verify_integrity` parses.

use std::path::{Path, PathBuf};

use agentos_audit::{AuditEntry, FlightRecorder};

use crate::ExitCode;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

pub fn execute(state_root: &Path, format: Format, limit: usize, verify: bool) -> anyhow::Result<ExitCode> {
    let recorder_dir = std::env::var_os("AGENTOS_RECORDER_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| state_root.join("recorder"));

    if verify {
        return match FlightRecorder::verify_integrity(&recorder_dir)? {
            None => {
                println!("Audit log verified: hash chain intact.");
                Ok(ExitCode::Success)
            }
            Some(seq) => {
                println!("INTEGRITY VIOLATION at seq {seq}.");
                println!("The audit log may have been tampered with.");
                Ok(ExitCode::RuntimeError)
            }
        };
    }

    let entries = read_all_entries(&recorder_dir)?;
    let tail: Vec<&AuditEntry> = entries.iter().rev().take(limit).collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&tail)?),
        Format::Text => {
            if tail.is_empty() {
                println!("No audit entries found at {}", recorder_dir.display());
            }
            for entry in tail.iter().rev() {
                println!(
                    "{:>6}  {}  {:<12}  {:<24}  {:<10}  {}",
                    entry.seq,
                    entry.ts.to_rfc3339(),
                    entry.agent_id,
                    entry.tool_name,
                    entry.decision,
                    entry.reason,
                );
            }
        }
    }

    Ok(ExitCode::Success)
}

fn discover_segments(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut segments: Vec<(u64, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(rest) = name.strip_prefix("audit-").and_then(|r| r.strip_suffix(".log")) else {
            continue;
        };
        let Some(start_s) = rest.splitn(2, '-').next() else { continue };
        if let Ok(start) = start_s.parse::<u64>() {
            segments.push((start, path));
        }
    }
    segments.sort_by_key(|(start, _)| *start);
    Ok(segments.into_iter().map(|(_, path)| path).collect())
}

fn read_all_entries(dir: &Path) -> anyhow::Result<Vec<AuditEntry>> {
    let mut out = Vec::new();
    for path in discover_segments(dir)? {
        let content = std::fs::read_to_string(&path)?;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(line)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentos_primitives::ActionType;

    fn seed(dir: &Path) {
        let mut recorder = FlightRecorder::open(dir).unwrap();
        for i in 0..3 {
            let entry = AuditEntry::draft(
                "agent-1",
                ActionType::FileRead,
                "fs",
                "deadbeef",
                agentos_audit::RecordedEffect::Allow,
                format!("read #{i}"),
                vec![],
            );
            recorder.append(entry).unwrap();
        }
    }

    #[test]
    fn dumps_entries_newest_suppressed_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let entries = read_all_entries(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].seq, 0);
        assert_eq!(entries[2].seq, 2);
    }

    #[test]
    fn verify_reports_clean_chain() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        assert_eq!(FlightRecorder::verify_integrity(dir.path()).unwrap(), None);
    }
}
