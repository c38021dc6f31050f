//! Durable session storage
//!
//! A small key-value abstraction over where the session survives restarts.
//! Writes go through [`KeyValueStore::write_batch`], which applies all of its
//! operations or none of them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Raw token string
pub const TOKEN_KEY: &str = "token";
/// Serialized `UserRecord` snapshot
pub const USER_KEY: &str = "user";
/// Id-only key written by older clients. Cleared on logout, never written.
pub const LEGACY_USER_ID_KEY: &str = "userId";

/// Every key the session owns
pub const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, LEGACY_USER_ID_KEY];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One mutation inside a batch: `Some` sets, `None` removes
pub type BatchOp = (&'static str, Option<String>);

/// Persistent key-value slot shared by the whole process
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply every operation atomically
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError>;

    fn set(&self, key: &'static str, value: String) -> Result<(), StorageError> {
        self.write_batch(vec![(key, Some(value))])
    }

    fn remove(&self, key: &'static str) -> Result<(), StorageError> {
        self.write_batch(vec![(key, None)])
    }

    /// Remove every key in one batch
    fn remove_all(&self, keys: &[&'static str]) -> Result<(), StorageError> {
        self.write_batch(keys.iter().map(|key| (*key, None)).collect())
    }

    fn contains(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

fn apply(map: &mut BTreeMap<String, String>, ops: Vec<BatchOp>) {
    for (key, value) in ops {
        match value {
            Some(value) => {
                map.insert(key.to_string(), value);
            }
            None => {
                map.remove(key);
            }
        }
    }
}

// =============================================================================
// File store
// =============================================================================

/// JSON file on disk holding every key
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store at `{base_path}/{filename}`
    pub fn new(base_path: impl Into<PathBuf>, filename: &str) -> Self {
        Self {
            path: base_path.into().join(filename),
            write_lock: Mutex::new(()),
        }
    }

    /// Make sure the parent directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if map.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(map)?;
        // Write aside, then rename over the old file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.load() {
            Ok(map) => map,
            // An unreadable file is replaced rather than blocking logout forever
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding corrupt session file"
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut map, ops);
        self.save(&map)
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// In-process store for tests and sessions that must not touch disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut entries, ops);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested"), "session.json");

        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store
            .write_batch(vec![
                (TOKEN_KEY, Some("abc".into())),
                (USER_KEY, Some("{}".into())),
            ])
            .unwrap();
        assert!(store.path().exists());
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        // A second handle on the same file sees the same data
        let reopened = FileStore::new(temp_dir.path().join("nested"), "session.json");
        assert_eq!(reopened.get(USER_KEY).unwrap().as_deref(), Some("{}"));

        store.remove(TOKEN_KEY).unwrap();
        assert!(!store.contains(TOKEN_KEY));
        assert!(store.contains(USER_KEY));
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "session.json");
        store.set(TOKEN_KEY, "abc".into()).unwrap();
        assert!(store.path().exists());

        store.remove_all(&SESSION_KEYS).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_replaces_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "session.json");
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.get(TOKEN_KEY), Err(StorageError::Corrupt(_))));
        store.set(TOKEN_KEY, "fresh".into()).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set(LEGACY_USER_ID_KEY, "u1".into()).unwrap();
        assert_eq!(store.len(), 1);
        store.remove(LEGACY_USER_ID_KEY).unwrap();
        assert!(store.is_empty());
    }
}
