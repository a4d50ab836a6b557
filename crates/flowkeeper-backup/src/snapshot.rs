//! Snapshot files
//!
//! Each backup is stored as `<name>.json` holding the metadata and the full
//! payload, so a snapshot can be verified on its own even if the index is lost.

use crate::element::FlowPayload;
use crate::error::{BackupError, Result};
use crate::fsutil::write_atomic;
use crate::index::BackupEntry;
use crate::naming::check_format;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use flowkeeper_core::paths::METADATA_FILENAME;
use flowkeeper_core::BackupPaths;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, warn};

/// Metadata embedded in a snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub checksum: String,
    pub flows_count: usize,
    pub nodes_count: usize,
    pub size: u64,
}

impl From<&BackupEntry> for SnapshotMetadata {
    fn from(entry: &BackupEntry) -> Self {
        Self {
            name: entry.name.clone(),
            timestamp: entry.timestamp,
            reason: entry.reason.clone(),
            checksum: entry.checksum.clone(),
            flows_count: entry.flows_count,
            nodes_count: entry.nodes_count,
            size: entry.size,
        }
    }
}

/// On-disk snapshot document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub metadata: SnapshotMetadata,
    pub flows: FlowPayload,
}

/// Reads and writes snapshot files in the backup directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    paths: BackupPaths,
}

impl SnapshotStore {
    pub fn new(paths: BackupPaths) -> Self {
        Self { paths }
    }

    /// Path of a snapshot file
    pub fn path_for(&self, name: &str) -> Utf8PathBuf {
        self.paths.snapshot_file(name)
    }

    /// Persist a snapshot. Name uniqueness is enforced by the caller.
    pub async fn write(&self, record: &SnapshotRecord) -> Result<Utf8PathBuf> {
        let path = self.path_for(&record.metadata.name);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| BackupError::serialization("snapshot", e))?;
        write_atomic(&path, &json).await?;
        debug!("Wrote snapshot {} ({} bytes)", path, json.len());
        Ok(path)
    }

    /// Load a snapshot.
    ///
    /// Fails with `NotFound` when the file is absent and `Corrupted` when it
    /// does not decode as a snapshot document.
    pub async fn read(&self, name: &str) -> Result<SnapshotRecord> {
        let path = self.path_for(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::not_found(name));
            }
            Err(e) => return Err(BackupError::io(&path, e)),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| BackupError::corrupted(name, format!("undecodable snapshot file: {}", e)))
    }

    /// Remove a snapshot file. Returns `false` when it did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BackupError::io(&path, e)),
        }
    }

    /// Delete, logging instead of failing.
    pub async fn remove_quietly(&self, name: &str) {
        if let Err(e) = self.delete(name).await {
            warn!("Failed to delete snapshot file for '{}': {}", name, e);
        }
    }

    pub async fn exists(&self, name: &str) -> bool {
        fs::try_exists(self.path_for(name)).await.unwrap_or(false)
    }

    /// Size of the snapshot file, `None` when missing.
    pub async fn file_size(&self, name: &str) -> Result<Option<u64>> {
        let path = self.path_for(name);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackupError::io(&path, e)),
        }
    }

    /// Names of every snapshot file on disk, sorted.
    pub async fn list_names(&self) -> Result<Vec<String>> {
        let dir = &self.paths.backup_dir;
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| BackupError::io(dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(dir, e))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name == METADATA_FILENAME {
                continue;
            }
            let Some(stem) = file_name.strip_suffix(".json") else {
                continue;
            };
            if check_format(stem).is_ok() {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
