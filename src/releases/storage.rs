// ABOUTME: Persistence for release histories, keyed by target.
// ABOUTME: LocalStorage writes one JSON file atomically; MemoryStorage backs tests.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::ReleaseHistory;

/// Default history file, relative to the project directory.
pub const DEFAULT_STORAGE_PATH: &str = ".skyhook/deployments.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupted release history in {path}: {source}")]
    Corrupted {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Release history store with read-modify-write per key.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<ReleaseHistory, StorageError>;

    /// Apply `change` to the history of `key` as a single unit and return the
    /// stored result.
    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(&mut ReleaseHistory),
    ) -> Result<ReleaseHistory, StorageError>;
}

type Record = BTreeMap<String, ReleaseHistory>;

/// Histories of all targets in one JSON file.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage at the default location under a project directory.
    pub fn in_project(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_STORAGE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Record, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Record::new());
        }
        serde_json::from_str(&content).map_err(|source| StorageError::Corrupted {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, record: &Record) -> Result<(), StorageError> {
        let write_error = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| write_error(e.into()))?;
        let temporary = self.path.with_extension("json.tmp");
        std::fs::write(&temporary, json).map_err(write_error)?;
        std::fs::rename(&temporary, &self.path).map_err(write_error)
    }
}

impl Storage for LocalStorage {
    fn load(&self, key: &str) -> Result<ReleaseHistory, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.remove(key).unwrap_or_default())
    }

    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(&mut ReleaseHistory),
    ) -> Result<ReleaseHistory, StorageError> {
        let _guard = self.lock.lock();
        let mut record = self.read()?;
        let history = record.entry(key.to_string()).or_default();
        change(history);
        let updated = history.clone();
        self.write(&record)?;
        Ok(updated)
    }
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    histories: Mutex<BTreeMap<String, ReleaseHistory>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<ReleaseHistory, StorageError> {
        Ok(self.histories.lock().get(key).cloned().unwrap_or_default())
    }

    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(&mut ReleaseHistory),
    ) -> Result<ReleaseHistory, StorageError> {
        let mut histories = self.histories.lock();
        let history = histories.entry(key.to_string()).or_default();
        change(history);
        Ok(history.clone())
    }
}
