use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::lock::{LockError, WriteLock};
use crate::io::recovery::{self, RecoveryEntry};
use crate::model::config::DEFAULT_LOCK_TIMEOUT_MS;

/// Error type for persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed task data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported task data version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A key-value store of serialized blobs.
pub trait BlobStore {
    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StorageError>;

    /// Keep data that would otherwise be lost (an unreadable blob, a failed
    /// write, a deleted subtree). Stores without a recovery area drop it.
    fn preserve(&mut self, _entry: RecoveryEntry) {}
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
    preserved: Vec<RecoveryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `blob` already stored under `key`
    pub fn with_blob(key: &str, blob: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.blobs.insert(key.to_string(), blob.into());
        store
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(|s| s.as_str())
    }

    pub fn preserved(&self) -> &[RecoveryEntry] {
        &self.preserved
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn preserve(&mut self, entry: RecoveryEntry) {
        self.preserved.push(entry);
    }
}

/// One `<key>.json` file per key inside a data directory, written atomically.
/// Preserved data goes to the directory's recovery log.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore {
            dir: dir.into(),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// How long [`lock`](Self::lock) waits for another process to let go.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`. Path separators in the key are flattened.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    /// Take the directory's advisory write lock, creating the directory if needed.
    pub fn lock(&self) -> Result<WriteLock, LockError> {
        fs::create_dir_all(&self.dir).map_err(|source| LockError::Open {
            path: self.dir.clone(),
            source,
        })?;
        WriteLock::acquire(&self.dir, self.lock_timeout)
    }
}

impl BlobStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read { path, source: e }),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir)
            .and_then(|_| recovery::atomic_write(&path, blob.as_bytes()))
            .map_err(|e| StorageError::Write { path, source: e })
    }

    fn preserve(&mut self, entry: RecoveryEntry) {
        recovery::log_recovery(&self.dir, entry);
    }
}
