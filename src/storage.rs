//! Durable client-side key/value storage.
//!
//! Mirrors the string-to-string "local storage" a game client has: the cache and
//! version stores serialize into plain strings and never see the backend.

use crate::error::StorageError;
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String key/value storage shared by the cache and version stores.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// Storage keeping one file per key inside a directory.
///
/// Writes go to a uniquely named temporary file in the same directory and are
/// renamed into place, so a crash mid-write leaves the previous value intact and
/// concurrent writers of one key never share a partial file.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Open (and create if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", file_name))
    }
}

impl KeyValueStorage for DirStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;

        // A failed persist drops the temporary file, removing it
        tmp.persist(self.path_for(key))
            .map(|_| ())
            .map_err(|e| io_err(e.error))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
