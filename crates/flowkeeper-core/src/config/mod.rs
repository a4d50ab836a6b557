//! Configuration types and loading
//!
//! The configuration file is optional. Every field has a default, so a missing
//! `~/.flowkeeper/config.yaml` yields a working archive under the Node-RED user
//! directory with room for ten backups.

mod loader;

pub use loader::ConfigLoader;

use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Complete Flowkeeper configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlowkeeperConfig {
    /// Node-RED user directory holding the live flow file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows_dir: Option<Utf8PathBuf>,

    /// Backup archive policies
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Backup archive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackupConfig {
    /// Directory under which the backup folder is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<Utf8PathBuf>,

    /// Maximum number of backups to keep
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Evict the oldest backups once `max_backups` is exceeded
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_path: None,
            max_backups: default_max_backups(),
            auto_cleanup: default_auto_cleanup(),
        }
    }
}

impl BackupConfig {
    /// Rejects values the archive cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_backups == 0 {
            return Err(Error::invalid_config("max-backups must be at least 1"));
        }
        Ok(())
    }
}

fn default_max_backups() -> usize {
    10
}
fn default_auto_cleanup() -> bool {
    true
}
