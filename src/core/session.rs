//! Session identity and local storage
//!
//! The webhook backend correlates messages by a client-generated session id.
//! The id is created once per "browser" (here: per data directory) and read
//! back on every later start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Storage key holding the session id
pub const SESSION_KEY: &str = "infrasense_session_id";

/// Prefix of generated session ids
pub const SESSION_PREFIX: &str = "web-";

/// Id used when no persistent storage exists
pub const FALLBACK_SESSION_ID: &str = "server";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage surviving restarts
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// What the current environment offers for persistence
#[derive(Clone)]
pub enum StorageCapability {
    Persistent(Arc<dyn LocalStorage>),
    Unavailable,
}

impl StorageCapability {
    /// File-backed storage in `data_dir`, or `Unavailable` if the directory cannot be created
    pub fn detect(data_dir: &Path) -> Self {
        match FileStorage::open(data_dir) {
            Ok(storage) => StorageCapability::Persistent(Arc::new(storage)),
            Err(e) => {
                tracing::warn!(
                    "Local storage unavailable at {}: {}",
                    data_dir.display(),
                    e
                );
                StorageCapability::Unavailable
            }
        }
    }
}

/// Return the stored session id, creating and storing one on first use
pub fn get_or_create_session_id(capability: &StorageCapability) -> String {
    let storage = match capability {
        StorageCapability::Persistent(storage) => storage,
        StorageCapability::Unavailable => return FALLBACK_SESSION_ID.to_string(),
    };

    match storage.get(SESSION_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => return existing,
        Ok(_) => {}
        Err(e) => tracing::warn!("Could not read session id, generating a new one: {}", e),
    }

    let id = format!("{}{}", SESSION_PREFIX, uuid::Uuid::new_v4().simple());
    match storage.set(SESSION_KEY, &id) {
        Ok(()) => tracing::info!("Created session id {}", id),
        Err(e) => tracing::warn!("Could not persist session id {}: {}", id, e),
    }
    id
}

/// A stored value with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    updated_at: DateTime<Utc>,
}

/// Local storage persisted as a JSON file
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "local_storage.json";

    /// Open storage inside `dir`, creating the directory if needed
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(Self::FILE_NAME),
            lock: Mutex::new(()),
        })
    }

    fn read_all(&self) -> Result<HashMap<String, StoredEntry>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key).map(|entry| entry.value))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        // A corrupt file is replaced rather than blocking every later write
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                updated_at: Utc::now(),
            },
        );
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

/// Process-lifetime storage
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
