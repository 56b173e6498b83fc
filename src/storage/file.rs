//! Directory-backed key/value storage.

use crate::error::{Result, StoreError};
use fs2::FileExt;
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use super::Storage;

/// Magic bytes for value files.
const VALUE_MAGIC: &[u8; 4] = b"PSV\0";

/// Current value file format version.
const VALUE_VERSION: u8 = 1;

/// Magic, version and length prefix.
const HEADER_LEN: u64 = 13;

/// Trailing CRC32.
const CHECKSUM_LEN: u64 = 4;

/// Extension of value files.
const VALUE_EXT: &str = "val";

/// Name of the directory lock file.
const LOCK_FILE: &str = "LOCK";

/// One file per key under a directory.
///
/// Values are written to a temporary file and renamed into place, so a
/// reader sees either the old or the new value. The directory is locked
/// exclusively for the lifetime of the storage.
pub struct FileStorage {
    /// Base directory.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// LRU cache for recently read values.
    cache: Mutex<LruCache<String, String>>,
}

impl FileStorage {
    /// Open (creating if needed) storage in the given directory.
    pub fn open(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = File::create(path.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            _lock_file: lock_file,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Directory holding the value files.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total size in bytes of all value files.
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if Self::key_of(&entry.path()).is_some() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.path.join(format!("{}.{}", key, VALUE_EXT)))
    }

    fn key_of(path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != VALUE_EXT {
            return None;
        }
        path.file_stem()?.to_str().map(str::to_string)
    }

    fn read_file(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;

        // Read and verify magic
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != VALUE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid value magic".into()));
        }

        // Read version
        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != VALUE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported value version: {}",
                version[0]
            )));
        }

        // Read content
        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let available = file
            .metadata()?
            .len()
            .saturating_sub(HEADER_LEN + CHECKSUM_LEN);
        if len > available {
            return Err(StoreError::InvalidFormat(format!(
                "Value length {} exceeds file size",
                len
            )));
        }

        let mut content = vec![0u8; len as usize];
        file.read_exact(&mut content)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&content);

        if stored_checksum != computed_checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        String::from_utf8(content)
            .map_err(|e| StoreError::InvalidFormat(format!("Value is not UTF-8: {}", e)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.lock().get(key).cloned() {
            return Ok(Some(cached));
        }

        let value_path = self.value_path(key)?;
        if !value_path.exists() {
            return Ok(None);
        }

        let value = Self::read_file(&value_path)?;
        self.cache.lock().put(key.to_string(), value.clone());
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let value_path = self.value_path(key)?;
        let tmp_path = value_path.with_extension("tmp");

        {
            let mut file = File::create(&tmp_path)?;

            // Write header
            file.write_all(VALUE_MAGIC)?;
            file.write_all(&[VALUE_VERSION])?;

            // Write content
            let content = value.as_bytes();
            file.write_all(&(content.len() as u64).to_le_bytes())?;
            file.write_all(content)?;

            // Write checksum
            file.write_all(&crc32fast::hash(content).to_le_bytes())?;

            file.sync_all()?;
        }

        fs::rename(&tmp_path, &value_path)?;
        self.cache.lock().put(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.cache.lock().pop(key);

        let value_path = self.value_path(key)?;
        if value_path.exists() {
            fs::remove_file(&value_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(key) = Self::key_of(&entry.path()) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        if self.cache.lock().contains(key) {
            return Ok(true);
        }
        Ok(self.value_path(key)?.exists())
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= 200
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidFormat(format!("Invalid storage key: {:?}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("kv"), 16).unwrap();

        storage.set("orders", "[]").unwrap();
        assert_eq!(storage.get("orders").unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.get("missing").unwrap(), None);
    }

    #[test]
    fn test_overwrite() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("kv"), 16).unwrap();

        storage.set("orderNumber", "1").unwrap();
        storage.set("orderNumber", "2").unwrap();
        assert_eq!(storage.get("orderNumber").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");

        {
            let storage = FileStorage::open(&path, 16).unwrap();
            storage.set("orders", "[{\"a\":1}]").unwrap();
        }

        let storage = FileStorage::open(&path, 16).unwrap();
        assert_eq!(storage.get("orders").unwrap().as_deref(), Some("[{\"a\":1}]"));
        assert_eq!(storage.keys().unwrap(), vec!["orders".to_string()]);
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("kv"), 16).unwrap();

        storage.set("isDemoMode", "true").unwrap();
        assert!(storage.contains("isDemoMode").unwrap());
        assert!(storage.remove("isDemoMode").unwrap());
        assert!(!storage.contains("isDemoMode").unwrap());
        assert!(!storage.remove("isDemoMode").unwrap());
    }

    #[test]
    fn test_keys_ignore_foreign_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");
        let storage = FileStorage::open(&path, 16).unwrap();

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        fs::write(path.join("notes.txt"), b"hello").unwrap();

        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("kv"), 16).unwrap();

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_detects_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");

        {
            let storage = FileStorage::open(&path, 16).unwrap();
            storage.set("orders", "[1,2,3]").unwrap();
        }

        // Flip a content byte behind the storage's back
        let file = path.join("orders.val");
        let mut bytes = fs::read(&file).unwrap();
        bytes[14] ^= 0xff;
        fs::write(&file, bytes).unwrap();

        let storage = FileStorage::open(&path, 16).unwrap();
        assert!(matches!(
            storage.get("orders"),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");

        {
            let storage = FileStorage::open(&path, 16).unwrap();
            storage.set("orders", "[1,2,3]").unwrap();
        }

        let file = path.join("orders.val");
        let mut bytes = fs::read(&file).unwrap();
        bytes[5..13].copy_from_slice(&(1u64 << 62).to_le_bytes());
        fs::write(&file, bytes).unwrap();

        let storage = FileStorage::open(&path, 16).unwrap();
        assert!(matches!(
            storage.get("orders"),
            Err(StoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_exclusive_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");

        let _first = FileStorage::open(&path, 16).unwrap();
        assert!(matches!(
            FileStorage::open(&path, 16),
            Err(StoreError::Locked)
        ));
    }
}
