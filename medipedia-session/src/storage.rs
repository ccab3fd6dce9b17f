//! Key/value persistence surfaces
//!
//! [`FileStore`] keeps one file per key under a directory, so a persisted
//! session survives process restarts. [`MemoryStore`] is process-local.

use medipedia_core::{storage_error, KeyValueStore, MedipediaResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// In-memory store, for tests and ephemeral front ends
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, e.g. a session left behind by an earlier run
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }

    fn entries(&self) -> MedipediaResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| storage_error!("Memory store lock poisoned", "memory_store"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> MedipediaResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> MedipediaResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> MedipediaResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// File-backed store: `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    storage_dir: PathBuf,
}

impl FileStore {
    /// Create the store, creating `storage_dir` if needed
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> MedipediaResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&storage_dir).map_err(|e| {
            storage_error!(
                format!("Cannot create {}", storage_dir.display()),
                "file_store",
                e
            )
        })?;

        info!("Session storage initialized at: {}", storage_dir.display());

        Ok(Self { storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path backing `key`; characters outside `[A-Za-z0-9_-]` become `_`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.storage_dir.join(format!("{}.json", file_stem))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> MedipediaResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => {
                debug!("Loaded {} from {}", key, path.display());
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error!(
                format!("Cannot read {}", path.display()),
                "file_store",
                e
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> MedipediaResult<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| {
            storage_error!(format!("Cannot write {}", path.display()), "file_store", e)
        })?;

        debug!("Saved {} to {}", key, path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> MedipediaResult<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error!(
                format!("Cannot remove {}", path.display()),
                "file_store",
                e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new().with_entry("seed", "1");
        assert_eq!(store.get("seed").unwrap().as_deref(), Some("1"));

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();

        FileStore::new(dir.path())
            .unwrap()
            .set("medipedia_user", r#"{"id":"a"}"#)
            .unwrap();

        let reopened = FileStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.get("medipedia_user").unwrap().as_deref(),
            Some(r#"{"id":"a"}"#)
        );
        assert!(dir.path().join("medipedia_user.json").exists());
    }

    #[test]
    fn file_store_missing_key_and_double_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested/sessions")).unwrap();

        assert_eq!(store.get("absent").unwrap(), None);
        store.remove("absent").unwrap();
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let path = store.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
    }
}
