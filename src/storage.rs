//! Small persistent key-value store for user preferences.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::StorageError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`. A missing file is an empty store.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            log::debug!("No storage file at {:?}", path);
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::APP_DIR).join("storage.json"))
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// The store used by the app: on disk when a config directory exists.
pub fn open_default_store() -> Box<dyn KeyValueStore> {
    let Some(path) = FileStore::default_path() else {
        log::warn!("No config directory; page selection will not persist");
        return Box::new(MemoryStore::default());
    };
    match FileStore::open(path.clone()) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("Failed to open storage {:?}: {}", path, e);
            Box::new(MemoryStore::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("eyes-annotate-{}-{}", std::process::id(), name))
            .join("storage.json")
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        assert_eq!(store.get("imageNum"), None);
        store.set("imageNum", "4").unwrap();
        assert_eq!(store.get("imageNum").as_deref(), Some("4"));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let path = scratch_path("persist");
        let _ = std::fs::remove_file(&path);

        let mut store = FileStore::open(path.clone()).unwrap();
        assert_eq!(store.get("imageNum"), None);
        store.set("imageNum", "3").unwrap();

        let reopened = FileStore::open(path.clone()).unwrap();
        assert_eq!(reopened.get("imageNum").as_deref(), Some("3"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let path = scratch_path("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStore::open(path.clone()), Err(StorageError::Json(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
