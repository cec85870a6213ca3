// Origin-scoped key/value storage, the client's equivalent of localStorage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One write in a batch; `None` removes the key.
pub type Change<'a> = (&'a str, Option<&'a str>);

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Applies every change or none of them.
    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.apply(&[(key, Some(value))])
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.apply(&[(key, None)])
    }
}

type Items = BTreeMap<String, String>;

fn lock(items: &Mutex<Items>) -> MutexGuard<'_, Items> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_changes(items: &mut Items, changes: &[Change<'_>]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                items.insert(key.to_string(), value.to_string());
            }
            None => {
                items.remove(*key);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<Items>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        apply_changes(&mut lock(&self.items), changes);
        Ok(())
    }
}

/// One JSON document per origin, loaded on open and written through on
/// every mutation. A failed write leaves both the file and the in-memory
/// view unchanged.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<Items>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Open the storage file belonging to `origin` inside `dir`.
    pub fn for_origin(dir: &Path, origin: &str) -> Result<Self, StorageError> {
        let storage_dir = dir.join("storage");
        if !storage_dir.exists() {
            fs::create_dir_all(&storage_dir)?;
        }
        Self::open(storage_dir.join(format!("{}.json", origin_file_stem(origin))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &Items) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        let mut items = lock(&self.items);
        let mut next = items.clone();
        apply_changes(&mut next, changes);
        self.persist(&next)?;
        *items = next;
        Ok(())
    }
}

/// `https://acme.example.com:8443` -> `https_acme.example.com_8443`
fn origin_file_stem(origin: &str) -> String {
    origin
        .replace("://", "_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").as_deref(), Some("1"));
        storage.remove_item("a").unwrap();
        assert!(storage.get_item("a").is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let origin = "https://acme.example.com";
        {
            let storage = FileStorage::for_origin(dir.path(), origin).unwrap();
            storage.set_item("statuswatch.access_token", "abc").unwrap();
        }
        let storage = FileStorage::for_origin(dir.path(), origin).unwrap();
        assert_eq!(storage.get_item("statuswatch.access_token").as_deref(), Some("abc"));
    }

    #[test]
    fn origins_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = FileStorage::for_origin(dir.path(), "https://app.example.com").unwrap();
        let acme = FileStorage::for_origin(dir.path(), "https://acme.example.com").unwrap();
        app.set_item("k", "v").unwrap();
        assert!(acme.get_item("k").is_none());
        assert_ne!(app.path(), acme.path());
    }

    #[test]
    fn failed_write_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("a", "old").unwrap();

        // A directory where the file should be makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(storage.apply(&[("a", Some("new")), ("b", Some("extra"))]).is_err());
        assert!(storage.remove_item("a").is_err());
        assert_eq!(storage.get_item("a").as_deref(), Some("old"));
        assert!(storage.get_item("b").is_none());
    }

    #[test]
    fn poisoned_memory_storage_still_writes() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.items.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").as_deref(), Some("1"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn origin_stem_is_filesystem_safe() {
        assert_eq!(origin_file_stem("http://localhost:5173"), "http_localhost_5173");
    }
}
