use std::path::PathBuf;

use easel_core::SessionConfig;
use serde::{Deserialize, Serialize};

/// Final CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EaselConfig {
    /// Where the persisted session lives
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage directory; defaults to `$XDG_DATA_HOME/easel/storage`
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, or the XDG default
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(easel_paths::storage_dir)
    }
}
