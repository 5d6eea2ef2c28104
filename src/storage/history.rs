//! Request history, newest first, capped at the last 50 requests.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{keys, BlobStore};

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub service: String,
    pub method: String,
    pub url: String,
    /// None when the request never produced an HTTP status (transport error).
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
        status: Option<u16>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service: service.into(),
            method: method.into(),
            url: url.into(),
            status,
            duration_ms,
            timestamp: Utc::now(),
        }
    }
}

pub struct RequestHistory {
    store: Arc<dyn BlobStore>,
}

impl RequestHistory {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn add(&self, entry: HistoryEntry) {
        let mut entries = self.list();
        entries.insert(0, entry);
        entries.truncate(HISTORY_LIMIT);
        self.persist(&entries);
    }

    pub fn list(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.store.get_blob(keys::HISTORY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Discarding unreadable request history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn clear(&self) {
        self.store.remove_blob(keys::HISTORY);
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        match serde_json::to_string(entries) {
            Ok(json) => self.store.set_blob(keys::HISTORY, &json),
            Err(e) => warn!("Failed to serialize request history: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn history() -> RequestHistory {
        RequestHistory::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn newest_entry_first() {
        let history = history();
        history.add(HistoryEntry::new("graph", "GET", "/v1.0/me", Some(200), 120));
        history.add(HistoryEntry::new("graph", "GET", "/v1.0/users", Some(200), 80));

        let entries = history.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "/v1.0/users");
        assert_eq!(entries[1].url, "/v1.0/me");
    }

    #[test]
    fn history_caps_at_limit() {
        let history = history();
        for i in 0..(HISTORY_LIMIT + 10) {
            history.add(HistoryEntry::new(
                "powerbi",
                "GET",
                format!("/dashboards/{}", i),
                Some(200),
                10,
            ));
        }

        let entries = history.list();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        // Oldest entries fell off the end.
        assert_eq!(entries[0].url, format!("/dashboards/{}", HISTORY_LIMIT + 9));
    }

    #[test]
    fn corrupt_blob_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set_blob(keys::HISTORY, "not json");
        let history = RequestHistory::new(store);
        assert!(history.list().is_empty());
    }
}
