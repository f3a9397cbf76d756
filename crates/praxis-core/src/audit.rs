//! Append-only audit trail for governance decisions.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audited event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// In-memory audit trail. Entries are only ever appended.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event_type: &str, data: serde_json::Value) {
        tracing::debug!(event = event_type, "audited");
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(limit);
        entries[skip..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the full trail to `path` as one JSON object per line.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let entries = self.recent(usize::MAX);
        for entry in &entries {
            let line = serde_json::to_string(entry)?;
            writeln!(file, "{}", line)?;
        }
        tracing::info!(path = %path.display(), entries = entries.len(), "audit log exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recent_returns_the_tail_in_order() {
        let log = AuditLog::new();
        for i in 0..5 {
            log.record("event", json!({ "i": i }));
        }

        let tail = log.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].data["i"], 3);
        assert_eq!(tail[1].data["i"], 4);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn export_writes_one_json_object_per_line() {
        let log = AuditLog::new();
        log.record("policy_added", json!({ "policy_id": "p1" }));
        log.record("action_evaluated", json!({ "action": "pickup" }));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("trail.jsonl");
        log.export_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<AuditEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, "policy_added");
        assert_eq!(entries[1].event_type, "action_evaluated");
    }
}
