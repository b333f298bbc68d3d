//! File-backed Storage implementation
//!
//! One file per key inside a storage directory. Every process that opens
//! the same directory shares the origin; changes made by other processes are
//! picked up through a `notify` watcher on the directory.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::broadcast;

use super::{Storage, StorageEvent};
use crate::error::StorageError;

/// Broadcast capacity for change notifications
const EVENT_CAPACITY: usize = 64;

/// Last value seen per key, used to build `old_value` and to drop our own
/// writes when the watcher reports them back
type SeenValues = Arc<Mutex<HashMap<String, Option<String>>>>;

/// Directory-backed storage shared across processes
pub struct FileStorage {
    dir: PathBuf,
    tx: broadcast::Sender<StorageEvent>,
    seen: SeenValues,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            dir,
            tx,
            seen: Arc::new(Mutex::new(HashMap::new())),
            watcher: Mutex::new(None),
        })
    }

    /// The storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }

    fn remember(&self, key: &str, value: Option<String>) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(key.to_string(), value);
        }
    }

    fn start_watcher(&self) -> Result<(), StorageError> {
        let mut guard = self
            .watcher
            .lock()
            .map_err(|_| StorageError::Unavailable("watcher lock poisoned".to_string()))?;
        if guard.is_some() {
            return Ok(());
        }

        let tx = self.tx.clone();
        let seen = Arc::clone(&self.seen);

        let mut watcher = recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => forward_event(&tx, &seen, event),
                Err(e) => tracing::warn!(error = %e, "storage watcher error"),
            }
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = ?self.dir, "watching storage directory");

        *guard = Some(watcher);
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        read_optional(&path)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{}.tmp", key));

        // Record before writing so the watcher does not echo our own change
        self.remember(key, Some(value.to_string()));

        fs::create_dir_all(&self.dir)?;
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.remember(key, None);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<StorageEvent>, StorageError> {
        // Subscribe first so nothing emitted during watcher setup is lost
        let rx = self.tx.subscribe();
        self.start_watcher()?;
        Ok(rx)
    }
}

/// Keys map directly to file names, so only a safe character set is allowed
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Runs on the notify thread: turn a filesystem event into StorageEvents
fn forward_event(
    tx: &broadcast::Sender<StorageEvent>,
    seen: &SeenValues,
    event: notify::Event,
) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    // The watch is non-recursive, so every path is a direct child of the storage directory
    for path in event.paths {
        let Some(key) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if validate_key(key).is_err() {
            continue;
        }

        let new_value = match read_optional(&path) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read changed storage key");
                continue;
            }
        };

        let Ok(mut seen) = seen.lock() else {
            return;
        };
        let old_value = seen.get(key).cloned().flatten();
        if seen.get(key) == Some(&new_value) {
            continue;
        }
        seen.insert(key.to_string(), new_value.clone());
        drop(seen);

        tracing::trace!(key, "storage key changed on disk");
        let _ = tx.send(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_get_missing_key() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        assert_eq!(storage.get_item("adminUser").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set_item("token", "abc").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), Some("abc".to_string()));
        assert!(!temp_dir.path().join(".token.tmp").exists());
    }

    #[test]
    fn test_remove() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set_item("token", "abc").unwrap();
        storage.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);

        // Removing again is fine
        storage.remove_item("token").unwrap();
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp_dir = tempdir().unwrap();

        {
            let storage = FileStorage::open(temp_dir.path()).unwrap();
            storage.set_item("studentUser", "{\"email\":\"a@b.com\"}").unwrap();
        }

        let storage = FileStorage::open(temp_dir.path()).unwrap();
        assert_eq!(
            storage.get_item("studentUser").unwrap(),
            Some("{\"email\":\"a@b.com\"}".to_string())
        );
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        for key in ["", "../escape", "a/b", ".hidden", "sp ace"] {
            let err = storage.set_item(key, "x").unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("nested/storage");
        let storage = FileStorage::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(storage.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_other_instance_write_is_notified() {
        let temp_dir = tempdir().unwrap();
        let watcher_side = FileStorage::open(temp_dir.path()).unwrap();
        let writer_side = FileStorage::open(temp_dir.path()).unwrap();
        let mut rx = watcher_side.subscribe().unwrap();

        writer_side.set_item("studentUser", "{}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.unwrap();
                if event.key == "studentUser" {
                    return event;
                }
            }
        })
        .await
        .expect("no storage event within timeout");

        assert_eq!(event.new_value, Some("{}".to_string()));
    }
}
