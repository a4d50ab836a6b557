//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Config file (`--config` path, or `~/.flowkeeper/config.yaml` when present)
//! 3. Environment variables (`FLOWKEEPER_*` prefix)
//! 4. CLI flags (handled by caller)

use super::FlowkeeperConfig;
use crate::error::{Error, Result};
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use tracing::debug;

/// Name of the config file inside the config directory
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Configuration loader
pub struct ConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.flowkeeper)
    pub fn new() -> Result<Self> {
        let home = get_home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        Ok(Self {
            config_dir: home.join(".flowkeeper"),
        })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Directory searched for `config.yaml`
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. The default file is optional.
    pub fn load(&self, explicit: Option<&Utf8Path>) -> Result<FlowkeeperConfig> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_not_found(path.as_str()));
                }
                self.load_yaml_file(path)?
            }
            None => {
                let default_path = self.config_dir.join(CONFIG_FILENAME);
                if default_path.exists() {
                    self.load_yaml_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path);
                    FlowkeeperConfig::default()
                }
            }
        };

        config = self.apply_env_overrides(config)?;
        config.backup.validate()?;

        Ok(config)
    }

    fn load_yaml_file(&self, path: &Utf8Path) -> Result<FlowkeeperConfig> {
        debug!("Loading config from {}", path);
        let content = fs::read_to_string(path)?;
        let config: FlowkeeperConfig = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, mut config: FlowkeeperConfig) -> Result<FlowkeeperConfig> {
        if let Ok(val) = env::var("FLOWKEEPER_BACKUP_PATH") {
            if !val.is_empty() {
                config.backup.backup_path = Some(Utf8PathBuf::from(val));
            }
        }

        if let Ok(val) = env::var("FLOWKEEPER_MAX_BACKUPS") {
            config.backup.max_backups = val.parse().map_err(|_| {
                Error::invalid_config("FLOWKEEPER_MAX_BACKUPS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("FLOWKEEPER_AUTO_CLEANUP") {
            config.backup.auto_cleanup = parse_bool(&val).ok_or_else(|| {
                Error::invalid_config("FLOWKEEPER_AUTO_CLEANUP must be true or false")
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
