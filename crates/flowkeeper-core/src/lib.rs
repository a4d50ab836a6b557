//! # flowkeeper-core
//!
//! Core library for Flowkeeper providing:
//! - Configuration loading (`~/.flowkeeper/config.yaml` plus `FLOWKEEPER_*` overrides)
//! - Resolution of the flow directory, backup directory and index locations
//! - Shared utilities (home directory lookup, byte formatting)

pub mod config;
pub mod error;
pub mod paths;
pub mod utils;

pub use config::{BackupConfig, ConfigLoader, FlowkeeperConfig};
pub use error::{Error, Result};
pub use paths::{BackupPaths, PathInputs};
pub use utils::{get_home_dir, human_bytes};
