use super::types::EaselConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<EaselConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Get user config path (`$XDG_CONFIG_HOME/easel/config.toml`)
    pub fn user_config_path() -> PathBuf {
        easel_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with EASEL_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("EASEL_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".easel/config.toml")
        }
    }

    /// Merge the given files in order; later files override earlier ones
    /// key by key, and missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<EaselConfig> {
        let mut merged = toml::Table::new();
        for path in paths {
            if path.exists() {
                let layer = Self::read_table(path)?;
                Self::merge_tables(&mut merged, layer);
            }
        }
        Self::finalize(merged)
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Deep-merge `overlay` into `base`; overlay values win only where set
    fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
        for (key, value) in overlay {
            match (base.get_mut(&key), value) {
                (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                    Self::merge_tables(base_table, overlay_table);
                }
                (_, value) => {
                    base.insert(key, value);
                }
            }
        }
    }

    /// Convert the merged table to the final config with defaults applied
    fn finalize(table: toml::Table) -> Result<EaselConfig> {
        let config: EaselConfig = toml::Value::Table(table).try_into()?;
        config.session.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::{AppProfile, AuthMode};
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(&[temp_dir.path().join("nope.toml")]).unwrap();
        assert_eq!(config.session.profile, AppProfile::PublicSite);
    }

    #[test]
    fn test_project_overrides_user_per_key() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            r#"
[storage]
dir = "/tmp/user-storage"

[session.auth]
mode = "remote"
base_url = "https://user.academy.example"
admin_role_marker = "ADMIN"
"#,
        );
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
[session]
profile = "admin_panel"

[session.auth]
base_url = "https://project.academy.example"
"#,
        );

        let config = ConfigLoader::load_layers(&[user, project]).unwrap();

        assert_eq!(config.storage.dir, Some(PathBuf::from("/tmp/user-storage")));
        assert_eq!(config.session.profile, AppProfile::AdminPanel);
        assert_eq!(config.session.auth.mode, AuthMode::Remote);
        assert_eq!(config.session.auth.admin_role_marker, "ADMIN");
        assert_eq!(
            config.session.auth.base_url.unwrap().as_str(),
            "https://project.academy.example/"
        );
    }

    #[test]
    fn test_invalid_session_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "config.toml", "[session.auth]\nmode = \"remote\"\n");

        let err = ConfigLoader::load_layers(&[path]).unwrap_err();
        assert!(err.to_string().contains("auth.base_url"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "broken.toml", "[session\n");

        let err = ConfigLoader::load_layers(&[path]).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        unsafe {
            std::env::set_var("EASEL_PROJECT_CONFIG_DIR", "/tmp/easel-e2e");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from("/tmp/easel-e2e/config.toml")
        );
        unsafe {
            std::env::remove_var("EASEL_PROJECT_CONFIG_DIR");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".easel/config.toml")
        );
    }
}
