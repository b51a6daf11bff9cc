//! Durable key-value persistence for the player position.
//!
//! One JSON file holds a map of string keys to string values. The position
//! record lives under [`POSITION_KEY`] as `{x, y, z, rotationY, pitch}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const POSITION_KEY: &str = "playerPosition";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage IO error: {}", e),
            StorageError::Json(e) => write!(f, "storage JSON error: {}", e),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// String-to-string persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`. A missing or unreadable file starts an empty store.
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Discarding malformed store {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// Persisted player pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(rename = "rotationY")]
    pub rotation_y: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl SavedPosition {
    /// Read the record. Absent or malformed data counts as no save.
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let raw = store.get(POSITION_KEY)?;
        match serde_json::from_str::<SavedPosition>(&raw) {
            Ok(saved) if saved.is_finite() => Some(saved),
            Ok(_) => {
                tracing::warn!("Saved position has non-finite values, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!("Saved position is malformed, ignoring: {}", e);
                None
            }
        }
    }

    pub fn store(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(POSITION_KEY, json)
    }

    pub fn clear(store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store.remove(POSITION_KEY)
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.rotation_y, self.pitch]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_names() {
        let saved = SavedPosition {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rotation_y: 0.5,
            pitch: -0.25,
        };
        let json: serde_json::Value = serde_json::to_value(saved).unwrap();
        assert_eq!(json["rotationY"], 0.5);
        assert_eq!(json["pitch"], -0.25);
    }

    #[test]
    fn test_load_roundtrip_and_missing_pitch() {
        let mut store = MemoryStore::new();
        assert!(SavedPosition::load(&store).is_none());

        store
            .set(POSITION_KEY, r#"{"x":0,"y":-50,"z":0,"rotationY":1}"#.into())
            .unwrap();
        let saved = SavedPosition::load(&store).unwrap();
        assert_eq!(saved.y, -50.0);
        assert_eq!(saved.pitch, 0.0);
    }

    #[test]
    fn test_malformed_is_no_save() {
        let mut store = MemoryStore::new();
        store.set(POSITION_KEY, "{not json".into()).unwrap();
        assert!(SavedPosition::load(&store).is_none());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = std::env::temp_dir().join(format!("folio_store_{}", std::process::id()));
        let path = dir.join("save.json");
        let _ = std::fs::remove_file(&path);

        let mut store = FileStore::open(&path);
        SavedPosition {
            x: 4.0,
            y: 1.0,
            z: -2.0,
            rotation_y: 0.0,
            pitch: 0.0,
        }
        .store(&mut store)
        .unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(SavedPosition::load(&reopened).unwrap().x, 4.0);

        let mut reopened = reopened;
        SavedPosition::clear(&mut reopened).unwrap();
        assert!(SavedPosition::load(&FileStore::open(&path)).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
