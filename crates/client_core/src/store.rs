//! Local key/value persistence for per-browser style session data.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("'{}' is not a valid store file: {source}", .path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}

/// A flat JSON object on disk. Every write replaces the file through a temp file + rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let body = serde_json::to_string_pretty(items).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(io_error(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_error(&self.path))?;
        debug!(path = %self.path.display(), keys = items.len(), "store flushed");
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StoreError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut items = self.read_all()?;
        if apply(&mut items) {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.update(|items| items.remove(key).is_some())
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
