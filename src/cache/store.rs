//! Durable key/value stores backing the API cache
//!
//! The cached client only needs get/set/remove over string keys. `FileStore`
//! persists each key as a file in an XDG-compliant cache directory so cached
//! payloads and the rate-limit deadline survive restarts; `MemoryStore` keeps
//! everything in a map and is what tests inject.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A value could not be serialized or deserialized
    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The in-memory store lock was poisoned by a panicking writer
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key/value storage injected into the cached API client
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as a file under a cache directory
///
/// Uses `~/.cache/solardash/` on Linux, or the platform equivalent.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore in the XDG cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "solardash")?;
        Some(Self {
            dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for a key
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a half-written entry behind
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Maps a cache key to a file name.
///
/// Bytes outside `[A-Za-z0-9_-]` become `%XX`, so the mapping is injective and
/// keys holding JSON (`{`, `"`, `:`) stay filesystem safe.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Process-local store, used in tests and when no cache directory exists
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let (store, _temp_dir) = create_test_store();
        store.set("solar_api_blocked_until", "1700000000000").unwrap();
        assert_eq!(
            store.get("solar_api_blocked_until").unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let store = FileStore::with_dir(nested.clone());

        store.set("key", "value").unwrap();

        assert!(nested.exists(), "Nested directory should be created");
        assert!(nested.join("key.json").exists());
    }

    #[test]
    fn test_overwrite_existing_value() {
        let (store, _temp_dir) = create_test_store();
        store.set("key", "first").unwrap();
        store.set("key", "second").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_remove_deletes_and_tolerates_missing() {
        let (store, _temp_dir) = create_test_store();
        store.set("key", "value").unwrap();
        store.remove("key").unwrap();
        assert!(store.get("key").unwrap().is_none());

        // Removing again is fine
        store.remove("key").unwrap();
    }

    #[test]
    fn test_json_keys_map_to_distinct_files() {
        let (store, temp_dir) = create_test_store();
        let a = r#"solar_data_power_{"endTime":"2024-01-01 23:59:59"}"#;
        let b = r#"solar_data_power_{"endTime":"2024-01-02 23:59:59"}"#;

        store.set(a, "A").unwrap();
        store.set(b, "B").unwrap();

        assert_eq!(store.get(a).unwrap().as_deref(), Some("A"));
        assert_eq!(store.get(b).unwrap().as_deref(), Some("B"));
        let files = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn test_escape_key_keeps_safe_characters() {
        assert_eq!(escape_key("solar_last_success_overview"), "solar_last_success_overview");
        assert_eq!(escape_key("a b"), "a%20b");
        assert_eq!(escape_key("{}"), "%7B%7D");
        // The escape character itself is escaped, so "%20" and " " cannot collide
        assert_eq!(escape_key("%20"), "%2520");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = FileStore::new() {
            let path_str = store.dir().to_string_lossy();
            assert!(path_str.contains("solardash"));
        }
        // Passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
