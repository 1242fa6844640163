//! Durable key-value slots backing the trip store.
//!
//! A slot holds one string value per key, read once at startup and overwritten
//! wholesale on every write, the way browser local storage is used.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot io error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("slot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait KeyValueSlot: Send + Sync {
    /// Returns `None` when nothing has been stored under `key` yet.
    fn get(&self, key: &str) -> Result<Option<String>, SlotError>;

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SlotError::Io { key: key.to_string(), source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        let io_err = |source: io::Error| SlotError::Io { key: key.to_string(), source };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // Readers only ever see a complete value.
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &target).map_err(io_err)?;
        Ok(())
    }
}

/// Process-local slot, used by tests and for running without a data directory.
#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let slot = Self::default();
        slot.values.lock().insert(key.to_string(), value.into());
        slot
    }
}

impl KeyValueSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_slot_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());
        assert!(slot.get("roamEasyTrips").unwrap().is_none());
    }

    #[test]
    fn file_slot_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested"));
        slot.set("k", "[1,2,3]").unwrap();
        slot.set("k", "[]").unwrap();
        assert_eq!(slot.get("k").unwrap().as_deref(), Some("[]"));
        assert!(slot.dir().join("k.json").exists());
        assert!(!slot.dir().join(".k.json.tmp").exists());
    }

    #[test]
    fn memory_slot_keeps_keys_apart() {
        let slot = MemorySlot::with_value("a", "1");
        slot.set("b", "2").unwrap();
        assert_eq!(slot.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(slot.get("b").unwrap().as_deref(), Some("2"));
        assert!(slot.get("c").unwrap().is_none());
    }
}
