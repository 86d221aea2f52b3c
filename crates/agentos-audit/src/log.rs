// log.rs — Append-only, hash-chained, rotating flight recorder.
//
// On-disk layout (spec §6):
//   <dir>/audit-<start_seq>-open.log        the active segment
//   <dir>/audit-<start_seq>-<end_seq>.log   sealed segments, after rotation
//   <dir>/audit.index                       JSONL index, one line per sealed
//                                            segment, mapping agent_id to the
//                                            (seq, byte_offset) pairs inside it
//
// Generalizes the single-file, non-rotating precedent to multi-segment
// storage: once the active segment exceeds `max_segment_bytes` it is sealed
// (renamed to its final `<start>-<end>` name) and a fresh active segment is
// opened, continuing the same hash chain.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::hasher;

pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct SegmentIndex {
    segment: String,
    start_seq: u64,
    end_seq: u64,
    /// agent_id -> list of (seq, byte_offset) for entries by that agent.
    agents: BTreeMap<String, Vec<(u64, u64)>>,
}

/// Append-only flight recorder. One instance owns the active segment for
/// a given state directory; multiple processes must not share a directory
/// concurrently (the precedent's single-writer assumption carries over).
pub struct FlightRecorder {
    dir: PathBuf,
    writer: BufWriter<File>,
    active_path: PathBuf,
    start_seq: u64,
    next_seq: u64,
    last_hash: String,
    bytes_written: u64,
    max_segment_bytes: u64,
    /// offsets accumulated for the *active* segment, merged into the index
    /// on rotation.
    active_offsets: BTreeMap<String, Vec<(u64, u64)>>,
}

impl FlightRecorder {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        Self::open_with_rotation(dir, DEFAULT_MAX_SEGMENT_BYTES)
    }

    pub fn open_with_rotation(
        dir: impl AsRef<Path>,
        max_segment_bytes: u64,
    ) -> Result<Self, AuditError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| AuditError::OpenFailed {
            path: dir.clone(),
            source,
        })?;

        let (active_path, start_seq, next_seq, last_hash) = Self::recover(&dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active_path)
            .map_err(|source| AuditError::OpenFailed {
                path: active_path.clone(),
                source,
            })?;
        let bytes_written = file
            .metadata()
            .map_err(|source| AuditError::OpenFailed {
                path: active_path.clone(),
                source,
            })?
            .len();

        Ok(Self {
            dir,
            writer: BufWriter::new(file),
            active_path,
            start_seq,
            next_seq,
            last_hash,
            bytes_written,
            max_segment_bytes,
            active_offsets: BTreeMap::new(),
        })
    }

    /// Find (or start) the active segment, recovering the hash-chain tail
    /// and next sequence number from whatever is already on disk.
    fn recover(dir: &Path) -> Result<(PathBuf, u64, u64, String), AuditError> {
        let mut sealed: Vec<(u64, u64, PathBuf)> = Vec::new();
        let mut active: Option<(u64, PathBuf)> = None;

        if dir.exists() {
            for entry in std::fs::read_dir(dir).map_err(|source| AuditError::OpenFailed {
                path: dir.to_path_buf(),
                source,
            })? {
                let entry = entry.map_err(|source| AuditError::OpenFailed {
                    path: dir.to_path_buf(),
                    source,
                })?;
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(rest) = name
                    .strip_prefix("audit-")
                    .and_then(|r| r.strip_suffix(".log"))
                else {
                    continue;
                };
                let mut parts = rest.splitn(2, '-');
                let (Some(start_s), Some(end_s)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let Ok(start) = start_s.parse::<u64>() else {
                    continue;
                };
                if end_s == "open" {
                    active = Some((start, path));
                } else if let Ok(end) = end_s.parse::<u64>() {
                    sealed.push((start, end, path));
                }
            }
        }

        if let Some((start, path)) = active {
            let (next_seq, last_hash) = Self::tail_of(&path)?;
            return Ok((path, start, next_seq, last_hash));
        }

        sealed.sort_by_key(|(start, _, _)| *start);
        if let Some((_, end, path)) = sealed.last() {
            let (_, last_hash) = Self::tail_of(path)?;
            let next_start = *end + 1;
            let active_path = dir.join(format!("audit-{}-open.log", next_start));
            return Ok((active_path, next_start, next_start, last_hash));
        }

        let active_path = dir.join("audit-0-open.log");
        Ok((active_path, 0, 0, hasher::genesis_hash()))
    }

    fn tail_of(path: &Path) -> Result<(u64, String), AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut last: Option<AuditEntry> = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            last = Some(serde_json::from_str(&line)?);
        }
        match last {
            Some(entry) => Ok((entry.seq + 1, entry.entry_hash)),
            None => Ok((0, hasher::genesis_hash())),
        }
    }

    /// Append an entry, filling in `seq`, `prev_hash`, and `entry_hash`.
    /// Rotates the active segment first if it would exceed the configured
    /// size limit.
    pub fn append(&mut self, mut entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        if self.bytes_written >= self.max_segment_bytes {
            self.rotate()?;
        }

        entry.seq = self.next_seq;
        entry.prev_hash = self.last_hash.clone();
        let canonical = entry.canonical_bytes();
        entry.entry_hash = hasher::chain_hash(&entry.prev_hash, &canonical);

        let json = serde_json::to_string(&entry)?;
        let offset = self.bytes_written;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;

        self.bytes_written += json.len() as u64 + 1;
        self.active_offsets
            .entry(entry.agent_id.clone())
            .or_default()
            .push((entry.seq, offset));
        self.last_hash = entry.entry_hash.clone();
        self.next_seq += 1;

        Ok(entry)
    }

    /// Seal the active segment and open a fresh one, preserving the chain.
    pub fn rotate(&mut self) -> Result<(), AuditError> {
        self.writer
            .flush()
            .map_err(|e| AuditError::RotationFailed(e.to_string()))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| AuditError::RotationFailed(e.to_string()))?;

        let end_seq = self.next_seq.saturating_sub(1);
        if self.next_seq == self.start_seq {
            // nothing written yet in this segment; nothing to seal.
            return Ok(());
        }
        let sealed_name = format!("audit-{}-{}.log", self.start_seq, end_seq);
        let sealed_path = self.dir.join(&sealed_name);
        std::fs::rename(&self.active_path, &sealed_path)
            .map_err(|e| AuditError::RotationFailed(e.to_string()))?;

        self.append_index_record(&sealed_name, end_seq)?;

        let new_start = self.next_seq;
        self.active_path = self.dir.join(format!("audit-{}-open.log", new_start));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.active_path)
            .map_err(|source| AuditError::OpenFailed {
                path: self.active_path.clone(),
                source,
            })?;
        self.writer = BufWriter::new(file);
        self.start_seq = new_start;
        self.bytes_written = 0;
        self.active_offsets.clear();
        Ok(())
    }

    fn append_index_record(&self, segment: &str, end_seq: u64) -> Result<(), AuditError> {
        let record = SegmentIndex {
            segment: segment.to_string(),
            start_seq: self.start_seq,
            end_seq,
            agents: self.active_offsets.clone(),
        };
        let json = serde_json::to_string(&record)?;
        let index_path = self.dir.join("audit.index");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .map_err(|source| AuditError::OpenFailed {
                path: index_path,
                source,
            })?;
        writeln!(file, "{}", json)?;
        file.sync_data()?;
        Ok(())
    }

    /// Return the last N entries for `agent_id`, newest last.
    ///
    /// Checks the active segment's in-memory offsets first, then walks
    /// sealed segments (via `audit.index`) from most to least recent.
    pub fn read_recent(&self, agent_id: &str, n: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let mut collected: Vec<AuditEntry> = Vec::new();

        if let Some(offsets) = self.active_offsets.get(agent_id) {
            for &(_, offset) in offsets.iter().rev() {
                if collected.len() >= n {
                    break;
                }
                collected.push(Self::read_at(&self.active_path, offset)?);
            }
        }

        if collected.len() < n {
            let index_path = self.dir.join("audit.index");
            if index_path.exists() {
                let records = Self::read_index(&index_path)?;
                for record in records.iter().rev() {
                    if collected.len() >= n {
                        break;
                    }
                    if let Some(offsets) = record.agents.get(agent_id) {
                        for &(_, offset) in offsets.iter().rev() {
                            if collected.len() >= n {
                                break;
                            }
                            let segment_path = self.dir.join(&record.segment);
                            collected.push(Self::read_at(&segment_path, offset)?);
                        }
                    }
                }
            }
        }

        collected.reverse();
        Ok(collected)
    }

    fn read_index(index_path: &Path) -> Result<Vec<SegmentIndex>, AuditError> {
        let file = File::open(index_path).map_err(|source| AuditError::OpenFailed {
            path: index_path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line).map_err(|e| {
                AuditError::IndexCorrupt(format!("malformed index line: {}", e))
            })?);
        }
        Ok(out)
    }

    fn read_at(path: &Path, offset: u64) -> Result<AuditEntry, AuditError> {
        let mut file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Verify the hash chain across every segment (sealed, in sequence
    /// order, then the active one). Returns the first sequence number at
    /// which the chain breaks, or `None` if the whole log is intact.
    pub fn verify_integrity(dir: impl AsRef<Path>) -> Result<Option<u64>, AuditError> {
        let dir = dir.as_ref();
        let mut segments: Vec<(u64, PathBuf)> = Vec::new();
        if dir.exists() {
            for entry in std::fs::read_dir(dir).map_err(|source| AuditError::OpenFailed {
                path: dir.to_path_buf(),
                source,
            })? {
                let entry = entry.map_err(|source| AuditError::OpenFailed {
                    path: dir.to_path_buf(),
                    source,
                })?;
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(rest) = name
                    .strip_prefix("audit-")
                    .and_then(|r| r.strip_suffix(".log"))
                else {
                    continue;
                };
                let Some(start_s) = rest.splitn(2, '-').next() else {
                    continue;
                };
                if let Ok(start) = start_s.parse::<u64>() {
                    segments.push((start, path));
                }
            }
        }
        segments.sort_by_key(|(start, _)| *start);

        let mut expected_prev = hasher::genesis_hash();
        for (_, path) in segments {
            let file = File::open(&path).map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: AuditEntry = serde_json::from_str(&line)?;
                if entry.prev_hash != expected_prev {
                    return Ok(Some(entry.seq));
                }
                let recomputed = hasher::chain_hash(&entry.prev_hash, &entry.canonical_bytes());
                if recomputed != entry.entry_hash {
                    return Ok(Some(entry.seq));
                }
                expected_prev = entry.entry_hash;
            }
        }
        Ok(None)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Force the active segment's buffered writes to disk. Every `append`
    /// already does this; exposed for callers (e.g. a graceful SIGTERM)
    /// that want an explicit durability point with no new entry to write.
    pub fn flush(&mut self) -> Result<(), AuditError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentos_primitives::{ActionType, SignalKind};
    use tempfile::tempdir;

    use crate::entry::RecordedEffect;

    fn draft(agent: &str) -> AuditEntry {
        AuditEntry::draft(
            agent,
            ActionType::FileRead,
            "fs",
            "digest",
            RecordedEffect::Allow,
            "ok",
            vec![],
        )
    }

    #[test]
    fn append_assigns_sequential_seq_and_chains_hashes() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open(dir.path()).unwrap();
        let e1 = rec.append(draft("agent-1")).unwrap();
        let e2 = rec.append(draft("agent-1")).unwrap();
        assert_eq!(e1.seq, 0);
        assert_eq!(e2.seq, 1);
        assert_eq!(e1.prev_hash, hasher::genesis_hash());
        assert_eq!(e2.prev_hash, e1.entry_hash);
    }

    #[test]
    fn verify_integrity_passes_on_untampered_log() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open(dir.path()).unwrap();
        for _ in 0..5 {
            rec.append(draft("agent-1")).unwrap();
        }
        assert_eq!(FlightRecorder::verify_integrity(dir.path()).unwrap(), None);
    }

    #[test]
    fn verify_integrity_detects_tampered_entry() {
        let dir = tempdir().unwrap();
        {
            let mut rec = FlightRecorder::open(dir.path()).unwrap();
            for _ in 0..3 {
                rec.append(draft("agent-1")).unwrap();
            }
        }
        let active = dir.path().join("audit-0-open.log");
        let content = std::fs::read_to_string(&active).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        let mut tampered: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        tampered.reason = "tampered".to_string();
        let tampered_json = serde_json::to_string(&tampered).unwrap();
        lines[1] = &tampered_json;
        std::fs::write(&active, lines.join("\n") + "\n").unwrap();

        let broken = FlightRecorder::verify_integrity(dir.path()).unwrap();
        assert_eq!(broken, Some(1));
    }

    #[test]
    fn reopening_recorder_continues_the_chain() {
        let dir = tempdir().unwrap();
        let last_hash = {
            let mut rec = FlightRecorder::open(dir.path()).unwrap();
            rec.append(draft("agent-1")).unwrap().entry_hash
        };
        let mut rec = FlightRecorder::open(dir.path()).unwrap();
        let next = rec.append(draft("agent-1")).unwrap();
        assert_eq!(next.seq, 1);
        assert_eq!(next.prev_hash, last_hash);
    }

    #[test]
    fn rotation_seals_segment_and_preserves_chain() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open_with_rotation(dir.path(), 1).unwrap();
        for _ in 0..3 {
            rec.append(draft("agent-1")).unwrap();
        }
        let sealed_exist = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with("audit-") && !n.ends_with("open.log"))
                    .unwrap_or(false)
            });
        assert!(sealed_exist);
        assert_eq!(FlightRecorder::verify_integrity(dir.path()).unwrap(), None);
    }

    #[test]
    fn read_recent_returns_newest_last_across_segments() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open_with_rotation(dir.path(), 1).unwrap();
        for _ in 0..4 {
            rec.append(draft("agent-1")).unwrap();
        }
        let recent = rec.read_recent("agent-1", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].seq < recent[1].seq);
        assert_eq!(recent[1].seq, 3);
    }

    #[test]
    fn read_recent_filters_by_agent() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open(dir.path()).unwrap();
        rec.append(draft("agent-1")).unwrap();
        rec.append(draft("agent-2")).unwrap();
        rec.append(draft("agent-1")).unwrap();
        let recent = rec.read_recent("agent-2", 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].agent_id, "agent-2");
    }

    #[test]
    fn signals_are_preserved_through_append() {
        let dir = tempdir().unwrap();
        let mut rec = FlightRecorder::open(dir.path()).unwrap();
        let mut e = draft("agent-1");
        e.signals = vec![SignalKind::Sigpolicy];
        let written = rec.append(e).unwrap();
        assert_eq!(written.signals, vec![SignalKind::Sigpolicy]);
    }
}
