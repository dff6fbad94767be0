use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{Storage, StorageError};

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}

/// 所有操作都以 IO 错误失败，用于检查错误是否被上报。
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingStorage;

#[cfg(test)]
impl FailingStorage {
    fn fail(key: &str) -> StorageError {
        StorageError::Io {
            path: std::path::PathBuf::from(format!("{key}.json")),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only disk"),
        }
    }
}

#[cfg(test)]
impl Storage for FailingStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Err(Self::fail(key))
    }

    fn set(&self, key: &str, _value: Value) -> Result<(), StorageError> {
        Err(Self::fail(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Err(Self::fail(key))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(Self::fail("*"))
    }
}
