//! In-memory Storage implementation
//!
//! A [`MemoryOrigin`] is one shared key/value area. Each call to
//! [`MemoryOrigin::open`] returns a [`MemoryStorage`] handle standing in for
//! one browser tab: writes through a handle are broadcast to every other
//! handle, never echoed back to the writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use super::{Storage, StorageEvent};
use crate::error::StorageError;

/// Default broadcast capacity per handle
const DEFAULT_CAPACITY: usize = 64;

type HandleId = u64;

struct OriginInner {
    items: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<(HandleId, broadcast::Sender<StorageEvent>)>>,
    next_handle: AtomicU64,
    capacity: usize,
}

impl OriginInner {
    fn poisoned() -> StorageError {
        StorageError::Unavailable("memory storage lock poisoned".to_string())
    }

    fn notify_others(&self, writer: HandleId, event: StorageEvent) {
        let Ok(listeners) = self.listeners.read() else {
            return;
        };
        for (id, tx) in listeners.iter() {
            if *id != writer {
                // No receivers is fine
                let _ = tx.send(event.clone());
            }
        }
    }
}

/// Shared in-memory storage area (one "origin")
#[derive(Clone)]
pub struct MemoryOrigin {
    inner: Arc<OriginInner>,
}

impl MemoryOrigin {
    /// Create an empty origin
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty origin with the given per-handle broadcast capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(OriginInner {
                items: RwLock::new(HashMap::new()),
                listeners: RwLock::new(Vec::new()),
                next_handle: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Open a new handle onto this origin
    pub fn open(&self) -> MemoryStorage {
        let id = self.inner.next_handle.fetch_add(1, Ordering::SeqCst);
        let (tx, _) = broadcast::channel(self.inner.capacity);
        if let Ok(mut listeners) = self.inner.listeners.write() {
            listeners.push((id, tx.clone()));
        }
        MemoryStorage {
            id,
            origin: Arc::clone(&self.inner),
            tx,
            dropped_writes: AtomicU32::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.inner.items.read() {
            Ok(items) => items.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }
}

impl Default for MemoryOrigin {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle onto a [`MemoryOrigin`]
///
/// Supports fault injection for tests: [`drop_next_writes`](Self::drop_next_writes)
/// makes writes silently vanish (privacy-mode storage), and
/// [`set_read_only`](Self::set_read_only) makes them fail with
/// [`StorageError::QuotaExceeded`].
pub struct MemoryStorage {
    id: HandleId,
    origin: Arc<OriginInner>,
    tx: broadcast::Sender<StorageEvent>,
    dropped_writes: AtomicU32,
    read_only: AtomicBool,
}

impl MemoryStorage {
    /// Open a handle onto a fresh, private origin
    pub fn new() -> Self {
        MemoryOrigin::new().open()
    }

    /// Silently discard the next `count` writes through this handle
    pub fn drop_next_writes(&self, count: u32) {
        self.dropped_writes.store(count, Ordering::SeqCst);
    }

    /// Reject every write through this handle
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn should_drop_write(&self) -> bool {
        self.dropped_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded(key.to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStorage {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.origin.listeners.write() {
            listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.origin.items.read().map_err(|_| OriginInner::poisoned())?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        if self.should_drop_write() {
            tracing::trace!(key, "dropping write");
            return Ok(());
        }

        let old_value = {
            let mut items = self.origin.items.write().map_err(|_| OriginInner::poisoned())?;
            items.insert(key.to_string(), value.to_string())
        };

        if old_value.as_deref() != Some(value) {
            self.origin.notify_others(
                self.id,
                StorageEvent {
                    key: key.to_string(),
                    old_value,
                    new_value: Some(value.to_string()),
                },
            );
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;

        let old_value = {
            let mut items = self.origin.items.write().map_err(|_| OriginInner::poisoned())?;
            items.remove(key)
        };

        if old_value.is_some() {
            self.origin.notify_others(
                self.id,
                StorageEvent {
                    key: key.to_string(),
                    old_value,
                    new_value: None,
                },
            );
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<StorageEvent>, StorageError> {
        Ok(self.tx.subscribe())
    }
}
