//! Persistent key-value storage for user settings

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use log::{error, info};
use serde_json::Value;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// A flat map of JSON values. Implementations must be safe to share between
/// tasks, but there's only ever one writer so no fancy coordination.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
}

/// Store that lives and dies with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<IndexMap<String, Value>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.values
            .lock()
            .map_err(|err| anyhow!("{err}"))?
            .insert(key.to_owned(), value);
        Ok(())
    }
}

/// Store backed by a JSON file. The whole file is read at startup and
/// rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<IndexMap<String, Value>>,
}

impl FileStore {
    /// Load the store from a file. A missing or broken file just means an
    /// empty store, and it'll be overwritten on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => {
                info!("Loaded {} setting(s) from {}", values.len(), path.display());
                values
            }
            Err(err) => {
                if err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|err| err.kind() == ErrorKind::NotFound)
                {
                    info!("No settings at {}, starting fresh", path.display());
                } else {
                    error!("Error loading settings from {}: {err:?}", path.display());
                }
                IndexMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> anyhow::Result<IndexMap<String, Value>> {
        let contents = fs::read(path)?;
        serde_json::from_slice(&contents)
            .with_context(|| format!("Error parsing {}", path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut values = self.values.lock().map_err(|err| anyhow!("{err}"))?;
        values.insert(key.to_owned(), value);
        info!("Saving setting `{key}` to {}", self.path.display());

        let serialized = serde_json::to_string_pretty(&*values)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Error creating directory {}", parent.display())
            })?;
        }
        fs::write(&self.path, serialized).with_context(|| {
            format!("Error saving settings to {}", self.path.display())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::default();
        assert_eq!(store.get("userCity"), None);
        store.set("userCity", json!("London")).unwrap();
        assert_eq!(store.get("userCity"), Some(json!("London")));
        store.set("userCity", json!("Paris")).unwrap();
        assert_eq!(store.get("userCity"), Some(json!("Paris")));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = FileStore::load(&path);
        assert_eq!(store.get("userCity"), None);
        store.set("userCity", json!("London")).unwrap();
        store
            .set("userCoordinates", json!({"latitude": 51.5, "longitude": -0.1}))
            .unwrap();

        // A fresh load sees everything that was saved
        let store = FileStore::load(&path);
        assert_eq!(store.get("userCity"), Some(json!("London")));
        assert_eq!(
            store.get("userCoordinates"),
            Some(json!({"latitude": 51.5, "longitude": -0.1}))
        );
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::load(&path);
        assert_eq!(store.get("userCity"), None);
        // Saving replaces the broken file
        store.set("userCity", json!("Cairo")).unwrap();
        assert_eq!(FileStore::load(&path).get("userCity"), Some(json!("Cairo")));
    }
}
