//! XDG Base Directory paths for easel.
//!
//! The CLI keeps its config and its persisted session storage under XDG
//! paths on every platform, the way tools like gh and kubectl do.

use std::path::PathBuf;

/// Get the easel config directory.
///
/// Returns `$XDG_CONFIG_HOME/easel` if set, otherwise `~/.config/easel`.
///
/// # Examples
///
/// ```
/// use easel_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("easel")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/easel")
    } else {
        PathBuf::from(".config/easel")
    }
}

/// Get the easel data directory.
///
/// Returns `$XDG_DATA_HOME/easel` if set, otherwise `~/.local/share/easel`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("easel")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/easel")
    } else {
        PathBuf::from(".local/share/easel")
    }
}

/// Directory holding the persisted key/value storage shared by every
/// `easel` process of the current user (the equivalent of one browser origin).
///
/// # Examples
///
/// ```
/// use easel_paths::{data_dir, storage_dir};
///
/// assert!(storage_dir().starts_with(data_dir()));
/// ```
pub fn storage_dir() -> PathBuf {
    data_dir().join("storage")
}
