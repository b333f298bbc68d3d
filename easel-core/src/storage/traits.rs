//! Storage trait definition

use tokio::sync::broadcast;

use crate::error::StorageError;

/// A change to one key, as observed by another handle of the same origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed
    pub key: String,
    /// Value before the change (`None` if the key was absent)
    pub old_value: Option<String>,
    /// Value after the change (`None` if the key was removed)
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Returns true if the change removed the key
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Synchronous key/value storage with cross-handle change notifications
///
/// Implementations must:
/// - Treat values as opaque strings
/// - Report failures as [`StorageError`] rather than panicking
/// - Deliver a [`StorageEvent`] to subscribers of other handles after each
///   successful `set_item`/`remove_item`
pub trait Storage: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribe to changes made through other handles
    fn subscribe(&self) -> Result<broadcast::Receiver<StorageEvent>, StorageError>;
}
