//! Configuration file handling.
//!
//! Reads from `~/.config/vpwmgr/vpwmgr.toml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vpwmgr_core::StoreConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Secret store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Vault id pre-filled on the login screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
    /// Whether the archive group is shown in the navigation tree.
    #[serde(default = "default_show_archive")]
    pub show_archive: bool,
    /// Group names to hide from the navigation tree.
    #[serde(default)]
    pub hidden_groups: Vec<String>,
}

fn default_show_archive() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_user: None,
            show_archive: default_show_archive(),
            hidden_groups: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, load from that path.
    /// Otherwise, load from the default XDG config location.
    /// Creates a default config file if it doesn't exist (only for default path).
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self> {
        let is_custom = custom_path.is_some();
        let config_path = match custom_path {
            Some(path) => path,
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            if !is_custom {
                let config = Config::default();
                config.save_to(&config_path)?;
                tracing::info!("Created default config at {}", config_path.display());
                return Ok(config);
            } else {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
        }

        Self::load_from(&config_path)
    }

    /// Parse the config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Get the path to the config file.
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("vpwmgr").join("vpwmgr.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpwmgr.toml");
        std::fs::write(
            &path,
            r#"
default_user = "user1"

[store]
vault_addr = "https://vault.example.com:8200"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.default_user.as_deref(), Some("user1"));
        assert_eq!(config.store.vault_addr, "https://vault.example.com:8200");
        assert_eq!(config.store.mount, "secret/vpwmgr");
        assert!(config.show_archive);
        assert!(config.hidden_groups.is_empty());
    }

    #[test]
    fn missing_custom_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vpwmgr.toml");
        let config = Config {
            show_archive: false,
            hidden_groups: vec!["scratch".into()],
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
