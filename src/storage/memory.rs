//! In-memory key/value storage.

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::Storage;

/// Storage that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.values.write().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().keys().cloned().collect())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().contains_key(key))
    }
}
