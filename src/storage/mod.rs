//! File-backed persistence for credentials, rate-limit logs, variables and
//! request history.
//!
//! Two backing stores exist: a permanent one under the user config directory
//! and a session one under the system temp directory. Callers pick the store;
//! the blob contract is the same for both. A blob that cannot be read or
//! parsed is treated as absent.

use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub mod history;

pub use history::{HistoryEntry, RequestHistory, HISTORY_LIMIT};

/// Well-known blob keys, shared between the library and the CLI layer.
pub mod keys {
    pub const CREDENTIALS: &str = "auth_credentials";
    pub const REMEMBER: &str = "remember_credentials";
    pub const RATE_LIMITS: &str = "rate_limits";
    pub const VARIABLES: &str = "variables";
    pub const HISTORY: &str = "request_history";
    pub const ENVIRONMENT: &str = "environment";
    pub const BATCH_QUEUE: &str = "batch_queue";
}

/// Minimal get/set/remove blob contract.
///
/// Write failures are logged and swallowed: losing a history entry or a
/// rate-limit snapshot must never abort a request that already ran.
pub trait BlobStore: Send + Sync {
    fn get_blob(&self, key: &str) -> Option<String>;
    fn set_blob(&self, key: &str, value: &str);
    fn remove_blob(&self, key: &str);
}

/// One file per key inside a dedicated directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store under the user config directory. Survives across sessions.
    pub fn permanent() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine user config directory"))?
            .join("msrest-cli");
        Ok(Self { dir })
    }

    /// Store under the system temp directory. Cleared by the OS between
    /// boots, which is as close to browser sessionStorage as a CLI gets.
    pub fn session() -> Self {
        Self {
            dir: std::env::temp_dir().join("msrest-cli-session"),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileStore {
    fn get_blob(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set_blob(&self, key: &str, value: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("Failed to create storage directory {:?}: {}", self.dir, e);
            return;
        }
        if let Err(e) = std::fs::write(self.path_for(key), value) {
            warn!("Failed to write blob '{}': {}", key, e);
        }
    }

    fn remove_blob(&self, key: &str) {
        let path = self.path_for(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove blob '{}': {}", key, e);
            }
        }
    }
}

/// In-memory store used by tests and as a null session store.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get_blob(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    fn set_blob(&self, key: &str, value: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove_blob(&self, key: &str) {
        self.blobs.lock().unwrap().remove(key);
    }
}
