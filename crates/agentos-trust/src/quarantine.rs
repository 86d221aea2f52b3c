// quarantine.rs — Sessions admitted past a warning rule via
// `X-User-Override: true` (spec §4.6 step 5).

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub trace_id: String,
    pub quarantined_at: DateTime<Utc>,
    pub warnings: Vec<String>,
}

#[derive(Default)]
pub struct QuarantineStore {
    records: Mutex<HashMap<String, QuarantineRecord>>,
}

impl QuarantineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, trace_id: impl Into<String>, warnings: Vec<String>) {
        let trace_id = trace_id.into();
        let record = QuarantineRecord {
            trace_id: trace_id.clone(),
            quarantined_at: Utc::now(),
            warnings,
        };
        self.records
            .lock()
            .expect("quarantine store lock poisoned")
            .insert(trace_id, record);
    }

    pub fn get(&self, trace_id: &str) -> Option<QuarantineRecord> {
        self.records
            .lock()
            .expect("quarantine store lock poisoned")
            .get(trace_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_retrieves_a_quarantine() {
        let store = QuarantineStore::new();
        store.record("trace-1", vec!["trust score < 7".to_string()]);
        let record = store.get("trace-1").unwrap();
        assert_eq!(record.trace_id, "trace-1");
        assert_eq!(record.warnings.len(), 1);
    }

    #[test]
    fn unknown_trace_id_returns_none() {
        let store = QuarantineStore::new();
        assert!(store.get("missing").is_none());
    }
}
