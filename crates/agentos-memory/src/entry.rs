// entry.rs — MemoryEntry: a single piece of agent memory and its
// integrity digest (spec §4.5 step 3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agentos_audit::hasher;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub agent_id: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = hasher::hash_str(&content);
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            content,
            content_hash,
            created_at: Utc::now(),
        }
    }

    /// Recompute the hash over `content` and compare against the stored
    /// `content_hash`. `false` means the entry was tampered with since write.
    pub fn verify(&self) -> bool {
        hasher::hash_str(&self.content) == self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_verifies() {
        let entry = MemoryEntry::new("agent-1", "hello");
        assert!(entry.verify());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let mut entry = MemoryEntry::new("agent-1", "hello");
        entry.content = "goodbye".to_string();
        assert!(!entry.verify());
    }
}
