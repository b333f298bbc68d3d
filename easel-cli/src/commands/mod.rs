pub mod config;
pub mod otp;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use easel_core::{FileStorage, SessionStore};

use crate::config::EaselConfig;

/// Open the configured storage directory and bootstrap a store on it
///
/// Every CLI process is one "tab": it shares the directory with any other
/// `easel` process pointed at the same place.
pub fn open_store(config: &EaselConfig) -> Result<Arc<SessionStore>> {
    let dir = config.storage.resolved_dir();
    let storage = FileStorage::open(&dir)
        .with_context(|| format!("failed to open storage at {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), "opened session storage");

    let store = SessionStore::from_config(Arc::new(storage), config.session.clone())?;
    Ok(Arc::new(store))
}
