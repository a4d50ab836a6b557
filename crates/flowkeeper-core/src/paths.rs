//! Backup location resolution
//!
//! [`BackupPaths::resolve`] is a pure function of its [`PathInputs`]; all
//! environment and home-directory lookups happen in [`PathInputs::gather`] so
//! resolution can be tested without touching process state.

use crate::config::FlowkeeperConfig;
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;

/// Folder created under the resolved backup path
pub const BACKUP_DIR_NAME: &str = ".flow-backups";

/// Archive index file inside the backup folder
pub const METADATA_FILENAME: &str = "backup_metadata.json";

/// Advisory lock file inside the backup folder
pub const LOCK_FILENAME: &str = ".backup.lock";

/// Live flow file inside the Node-RED user directory
pub const FLOW_FILENAME: &str = "flows.json";

/// Node-RED user directory used when nothing else is configured
pub const DEFAULT_USER_DIR_NAME: &str = ".node-red";

/// Environment override for the Node-RED user directory
pub const USER_DIR_ENV: &str = "NODE_RED_USER_DIR";

/// Environment override for the live flow file
pub const FLOW_FILE_ENV: &str = "NODE_RED_FLOW_FILE";

/// Everything the resolver depends on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathInputs {
    /// `backup-path` from configuration
    pub backup_path: Option<Utf8PathBuf>,
    /// `flows-dir` from configuration
    pub flows_dir: Option<Utf8PathBuf>,
    /// Home directory, if one could be determined
    pub home_dir: Option<Utf8PathBuf>,
    /// Value of `NODE_RED_USER_DIR`
    pub env_user_dir: Option<Utf8PathBuf>,
    /// Value of `NODE_RED_FLOW_FILE`
    pub env_flow_file: Option<Utf8PathBuf>,
}

impl PathInputs {
    /// Collect inputs from configuration and the process environment.
    pub fn gather(config: &FlowkeeperConfig) -> Self {
        Self {
            backup_path: config.backup.backup_path.clone(),
            flows_dir: config.flows_dir.clone(),
            home_dir: get_home_dir(),
            env_user_dir: non_empty_env(USER_DIR_ENV),
            env_flow_file: non_empty_env(FLOW_FILE_ENV),
        }
    }
}

fn non_empty_env(key: &str) -> Option<Utf8PathBuf> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Utf8PathBuf::from)
}

/// Resolved on-disk locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    /// Node-RED user directory
    pub flows_root: Utf8PathBuf,
    /// Folder holding snapshots and the index
    pub backup_dir: Utf8PathBuf,
    /// Archive index document
    pub metadata_file: Utf8PathBuf,
    /// Flow file the running Node-RED instance loads
    pub live_flow_file: Utf8PathBuf,
}

impl BackupPaths {
    /// Resolve locations from inputs.
    ///
    /// Flow root precedence: `NODE_RED_USER_DIR`, configured `flows-dir`,
    /// `$HOME/.node-red`, then `.node-red` relative to the working directory.
    /// The backup folder lives under `backup-path` when set, else under the
    /// flow root.
    pub fn resolve(inputs: &PathInputs) -> Self {
        let flows_root = inputs
            .env_user_dir
            .clone()
            .or_else(|| inputs.flows_dir.clone())
            .or_else(|| inputs.home_dir.as_ref().map(|h| h.join(DEFAULT_USER_DIR_NAME)))
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_USER_DIR_NAME));

        let backup_base = inputs.backup_path.as_ref().unwrap_or(&flows_root);
        let backup_dir = backup_base.join(BACKUP_DIR_NAME);
        let metadata_file = backup_dir.join(METADATA_FILENAME);

        let live_flow_file = inputs
            .env_flow_file
            .clone()
            .unwrap_or_else(|| flows_root.join(FLOW_FILENAME));

        Self {
            flows_root,
            backup_dir,
            metadata_file,
            live_flow_file,
        }
    }

    /// Locations for an archive rooted directly at `backup_dir`.
    pub fn for_backup_dir(backup_dir: impl Into<Utf8PathBuf>) -> Self {
        let backup_dir = backup_dir.into();
        let flows_root = backup_dir
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| backup_dir.clone());
        Self {
            live_flow_file: flows_root.join(FLOW_FILENAME),
            metadata_file: backup_dir.join(METADATA_FILENAME),
            flows_root,
            backup_dir,
        }
    }

    /// File name used for a snapshot
    pub fn snapshot_filename(name: &str) -> String {
        format!("{}.json", name)
    }

    /// Full path of a snapshot file
    pub fn snapshot_file(&self, name: &str) -> Utf8PathBuf {
        self.backup_dir.join(Self::snapshot_filename(name))
    }

    /// Advisory lock file guarding index mutations
    pub fn lock_file(&self) -> Utf8PathBuf {
        self.backup_dir.join(LOCK_FILENAME)
    }
}
