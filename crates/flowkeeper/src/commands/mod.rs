//! CLI command implementations

pub mod backup;
pub mod tool;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use flowkeeper_backup::{BackupManager, BackupTools, FileFlowSource, ToolResult};
use flowkeeper_core::{BackupPaths, ConfigLoader, PathInputs};
use std::sync::Arc;
use tracing::debug;

use crate::output;

/// Resolve configuration and paths, then wire the archive to the flow file.
pub fn open_tools(
    config_path: Option<&Utf8Path>,
    backup_path: Option<Utf8PathBuf>,
    flow_file: Option<Utf8PathBuf>,
) -> Result<BackupTools> {
    let loader = ConfigLoader::new()
        .unwrap_or_else(|_| ConfigLoader::with_dir(Utf8PathBuf::from(".flowkeeper")));
    let mut config = loader
        .load(config_path)
        .context("Failed to load configuration")?;

    if let Some(path) = backup_path {
        config.backup.backup_path = Some(path);
    }

    let mut paths = BackupPaths::resolve(&PathInputs::gather(&config));
    if let Some(file) = flow_file {
        paths.live_flow_file = file;
    }
    debug!(
        "Backup directory {}, flow file {}",
        paths.backup_dir, paths.live_flow_file
    );

    let flows = Arc::new(FileFlowSource::new(paths.live_flow_file.clone()));
    let manager = BackupManager::new(paths, &config.backup, flows.clone());
    Ok(BackupTools::new(manager).with_target(flows))
}

/// Print a tool result as JSON, failing the command when the call failed.
pub fn emit(tool: &str, result: ToolResult) -> Result<()> {
    output::json(&result)?;
    match result.error {
        Some(error) => Err(anyhow::anyhow!("{} failed: {}", tool, error.code)),
        None => Ok(()),
    }
}
