use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::atomic::{write_atomic, WriteFailure};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize store {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<WriteFailure> for StoreError {
    fn from(failure: WriteFailure) -> Self {
        match failure {
            WriteFailure::CreateDir { path, source } => StoreError::CreateDir { path, source },
            WriteFailure::Write { path, source } => StoreError::Write { path, source },
        }
    }
}

/// 同步的鍵值字串儲存。 / Synchronous string key-value store that survives restarts.
pub trait PersistentStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// 記憶體內的儲存，供測試與暫時性主程式使用。 / In-memory store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            values: RefCell::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// 以 JSON 物件檔案保存的儲存。 / Store persisted as one JSON object file.
///
/// Every mutation rewrites the file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    /// 從路徑載入；檔案不存在時回傳空的儲存。 / Loads from disk, starting empty when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                values: RefCell::new(BTreeMap::new()),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let values: BTreeMap<String, String> = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?
        };
        debug!(path = %path.display(), keys = values.len(), "store loaded");
        Ok(Self {
            path,
            values: RefCell::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(&*self.values.borrow()).map_err(|source| {
            StoreError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        write_atomic(&self.path, &payload).map_err(StoreError::from)
    }

    /// 寫入失敗時還原該鍵先前的值。 / Puts `key` back to `previous` when the write failed.
    fn persist_or_restore(&self, key: &str, previous: Option<String>) -> Result<(), StoreError> {
        self.persist().map_err(|err| {
            let mut values = self.values.borrow_mut();
            match previous {
                Some(value) => values.insert(key.to_string(), value),
                None => values.remove(key),
            };
            warn!(key, error = %err, "store write failed; entry restored");
            err
        })
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self
            .values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.persist_or_restore(key, previous)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let previous = self.values.borrow_mut().remove(key);
        if previous.is_some() {
            self.persist_or_restore(key, previous)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::with_entries([("theme", "dark")]);
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
        store.set("theme", "light").unwrap();
        assert_eq!(store.get("theme").as_deref(), Some("light"));
        store.remove("theme").unwrap();
        assert!(store.get("theme").is_none());
        store.remove("theme").unwrap();
        assert!(store.is_empty());
    }
}
