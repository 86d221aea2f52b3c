// store.rs — MemoryStore: the write/read/batch-scan surface (spec §4.5).
//
// Durable by entry: every write lands at
// `<base_dir>/<agent_id>/<id>.entry` before the call returns (spec §6),
// with an in-memory `HashMap` mirroring disk for read/batch-scan speed.
// `new` re-hydrates that map by walking `base_dir` once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::entry::MemoryEntry;
use crate::error::MemoryError;
use crate::screen::{screen_content, ScreenResult};

/// Outcome of a write: either the entry was stored (possibly with an
/// alert attached), or rejected outright.
#[derive(Debug)]
pub struct WriteOutcome {
    pub entry: MemoryEntry,
    pub alert: Option<ScreenResult>,
}

pub struct MemoryStore {
    base_dir: PathBuf,
    entries: Mutex<HashMap<Uuid, MemoryEntry>>,
}

impl MemoryStore {
    /// Open (or create) the on-disk entry store rooted at `base_dir`,
    /// re-hydrating the in-memory index from whatever `.entry` files are
    /// already there.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        let entries = Self::load_existing(&base_dir)?;
        Ok(Self {
            base_dir,
            entries: Mutex::new(entries),
        })
    }

    fn load_existing(base_dir: &Path) -> Result<HashMap<Uuid, MemoryEntry>, MemoryError> {
        let mut entries = HashMap::new();
        for agent_dir in std::fs::read_dir(base_dir)? {
            let agent_dir = agent_dir?.path();
            if !agent_dir.is_dir() {
                continue;
            }
            for file in std::fs::read_dir(&agent_dir)? {
                let path = file?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("entry") {
                    continue;
                }
                let raw = std::fs::read_to_string(&path)?;
                let entry: MemoryEntry = serde_json::from_str(&raw)?;
                entries.insert(entry.id, entry);
            }
        }
        Ok(entries)
    }

    fn entry_path(&self, agent_id: &str, id: Uuid) -> PathBuf {
        self.base_dir.join(agent_id).join(format!("{}.entry", id))
    }

    fn persist(&self, entry: &MemoryEntry) -> Result<(), MemoryError> {
        let agent_dir = self.base_dir.join(&entry.agent_id);
        std::fs::create_dir_all(&agent_dir)?;
        let path = self.entry_path(&entry.agent_id, entry.id);
        let json = serde_json::to_string(entry)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Screen and, if accepted, persist `content`. CRITICAL findings
    /// fail-closed with `MemoryError::Rejected`; HIGH findings persist the
    /// entry but return the screen result as an alert.
    pub fn write(&self, agent_id: impl Into<String>, content: impl Into<String>) -> Result<WriteOutcome, MemoryError> {
        let content = content.into();
        let result = screen_content(&content);
        if result.should_reject() {
            let reason = result
                .findings
                .iter()
                .map(|f| f.detail.clone())
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(reason = %reason, "memory write rejected");
            return Err(MemoryError::Rejected { reason });
        }

        let entry = MemoryEntry::new(agent_id, content);
        let alert = if result.should_alert() {
            tracing::warn!(entry_id = %entry.id, "memory write accepted with alert");
            Some(result)
        } else {
            None
        };

        self.persist(&entry)?;
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        entries.insert(entry.id, entry.clone());
        Ok(WriteOutcome { entry, alert })
    }

    /// Read an entry, verifying its content hash. A mismatch means the
    /// entry was tampered with since write (spec §4.5 read path).
    pub fn read(&self, id: Uuid) -> Result<MemoryEntry, MemoryError> {
        let entries = self.entries.lock().expect("memory store lock poisoned");
        let entry = entries.get(&id).ok_or(MemoryError::NotFound { id: id.to_string() })?;
        if !entry.verify() {
            return Err(MemoryError::Tampered { id: id.to_string() });
        }
        Ok(entry.clone())
    }

    /// Used by tests/operators to simulate at-rest tampering: bypasses the
    /// write screen and hash recomputation entirely, corrupting both the
    /// in-memory copy and the entry file on disk.
    #[doc(hidden)]
    pub fn corrupt_for_test(&self, id: Uuid, new_content: impl Into<String>) {
        let new_content = new_content.into();
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        if let Some(entry) = entries.get_mut(&id) {
            entry.content = new_content;
            let _ = self.persist(entry);
        }
    }

    /// Independent, non-mutating scan over every stored entry's content,
    /// producing the alert set (spec §4.5 batch scan).
    pub fn batch_scan(&self) -> Vec<(Uuid, ScreenResult)> {
        let entries = self.entries.lock().expect("memory store lock poisoned");
        entries
            .values()
            .map(|entry| (entry.id, screen_content(&entry.content)))
            .filter(|(_, result)| !result.findings.is_empty())
            .collect()
    }
}
