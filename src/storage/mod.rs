//! Key/value document storage.
//!
//! Every persisted document (the order list, the catalog, the order
//! counter, each backup snapshot) lives under its own string key and is
//! read and written whole. Two backends are provided:
//!
//! - [`FileStorage`]: one checksummed file per key in a locked directory
//! - [`MemoryStorage`]: a map behind a lock, for tests and throwaway stores

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Whole-value key/value storage.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key` in a single write.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns false if it was not present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// List every stored key, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
