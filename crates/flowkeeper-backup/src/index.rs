//! Archive index
//!
//! A single JSON document (`backup_metadata.json`) lists every snapshot.
//! [`ArchiveIndex`] is the in-memory document with the pure bookkeeping rules;
//! [`MetadataIndex`] loads and persists it. Every mutation is a full
//! read-modify-write of the document.

use crate::error::{BackupError, Result};
use crate::fsutil::write_atomic;
use crate::lock::ArchiveLock;
use crate::snapshot::{SnapshotMetadata, SnapshotStore};
use chrono::{DateTime, Utc};
use flowkeeper_core::{BackupConfig, BackupPaths};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;
use tracing::{debug, info};

/// Version of the index document format.
pub const INDEX_VERSION: &str = "1.0.0";

/// Archive-wide settings stored in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    pub max_backups: usize,
    pub auto_cleanup: bool,
}

impl From<&BackupConfig> for IndexConfig {
    fn from(config: &BackupConfig) -> Self {
        Self {
            max_backups: config.max_backups,
            auto_cleanup: config.auto_cleanup,
        }
    }
}

/// Index record for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub checksum: String,
    pub flows_count: usize,
    pub nodes_count: usize,
    pub size: u64,
    pub filename: String,
}

impl BackupEntry {
    /// Build an index record from a snapshot's embedded metadata.
    pub fn from_metadata(metadata: &SnapshotMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            timestamp: metadata.timestamp,
            reason: metadata.reason.clone(),
            checksum: metadata.checksum.clone(),
            flows_count: metadata.flows_count,
            nodes_count: metadata.nodes_count,
            size: metadata.size,
            filename: BackupPaths::snapshot_filename(&metadata.name),
        }
    }
}

/// The index document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub version: String,
    pub config: IndexConfig,
    pub backups: Vec<BackupEntry>,
}

impl ArchiveIndex {
    /// Fresh document with no entries
    pub fn new(config: IndexConfig) -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            config,
            backups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&BackupEntry> {
        self.backups.iter().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Add an entry, rejecting duplicate names.
    pub fn append(&mut self, entry: BackupEntry) -> Result<()> {
        if self.contains(&entry.name) {
            return Err(BackupError::duplicate(entry.name));
        }
        self.backups.push(entry);
        Ok(())
    }

    /// Remove and return an entry.
    pub fn remove(&mut self, name: &str) -> Option<BackupEntry> {
        let position = self.backups.iter().position(|b| b.name == name)?;
        Some(self.backups.remove(position))
    }

    /// Entries newest first. Equal timestamps order the later-appended entry first.
    pub fn newest_first(&self) -> Vec<&BackupEntry> {
        let mut entries: Vec<&BackupEntry> = self.backups.iter().rev().collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&BackupEntry> {
        self.newest_first().into_iter().next()
    }

    /// Drop the entries beyond capacity and return them, oldest last.
    ///
    /// Does nothing when auto-cleanup is disabled or the index is within capacity.
    pub fn take_evicted(&mut self) -> Vec<BackupEntry> {
        if !self.config.auto_cleanup || self.backups.len() <= self.config.max_backups {
            return Vec::new();
        }

        let retained: HashSet<String> = self
            .newest_first()
            .into_iter()
            .take(self.config.max_backups)
            .map(|b| b.name.clone())
            .collect();

        let (kept, evicted): (Vec<_>, Vec<_>) = std::mem::take(&mut self.backups)
            .into_iter()
            .partition(|b| retained.contains(&b.name));
        self.backups = kept;

        let mut evicted = evicted;
        evicted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        evicted
    }
}

/// Listing view of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupView {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub checksum: String,
    pub is_latest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl BackupView {
    fn from_entry(entry: &BackupEntry, is_latest: bool, detailed: bool) -> Self {
        Self {
            name: entry.name.clone(),
            timestamp: entry.timestamp,
            reason: entry.reason.clone(),
            checksum: entry.checksum.clone(),
            is_latest,
            flows_count: detailed.then_some(entry.flows_count),
            nodes_count: detailed.then_some(entry.nodes_count),
            size: detailed.then_some(entry.size),
        }
    }
}

/// Persistence for the index document
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    paths: BackupPaths,
    defaults: IndexConfig,
}

impl MetadataIndex {
    /// `defaults` is written only when the index is first created.
    pub fn new(paths: BackupPaths, defaults: IndexConfig) -> Self {
        Self { paths, defaults }
    }

    /// Configuration a fresh index would be created with
    pub fn defaults(&self) -> IndexConfig {
        self.defaults
    }

    /// Create the backup directory and an empty index if absent. Idempotent.
    ///
    /// Must not be called while holding the archive lock.
    pub async fn ensure_initialized(&self) -> Result<()> {
        let dir = &self.paths.backup_dir;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| BackupError::io(dir, e))?;

        let path = &self.paths.metadata_file;
        if fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        // Re-check under the lock so a concurrent initializer never clobbers a populated index
        let _lock = ArchiveLock::acquire(&self.paths.lock_file()).await?;
        if fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        self.save(&ArchiveIndex::new(self.defaults)).await?;
        info!(
            "Initialized backup index at {} (max {} backups, auto-cleanup {})",
            path, self.defaults.max_backups, self.defaults.auto_cleanup
        );
        Ok(())
    }

    /// Read the document.
    pub async fn load(&self) -> Result<ArchiveIndex> {
        let path = &self.paths.metadata_file;
        let bytes = fs::read(path).await.map_err(|e| BackupError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackupError::CorruptedIndex {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the document on disk.
    pub async fn save(&self, index: &ArchiveIndex) -> Result<()> {
        let json = serde_json::to_vec_pretty(index)
            .map_err(|e| BackupError::serialization("backup index", e))?;
        write_atomic(&self.paths.metadata_file, &json).await?;
        debug!("Saved backup index with {} entries", index.len());
        Ok(())
    }

    /// Add an entry to a loaded document. Persisting is the caller's job.
    pub fn append(&self, mut index: ArchiveIndex, entry: BackupEntry) -> Result<ArchiveIndex> {
        index.append(entry)?;
        Ok(index)
    }

    /// Enforce capacity on a loaded document.
    ///
    /// Snapshot files of evicted entries are deleted best-effort; a failed
    /// deletion is logged and does not fail the prune. Returns the retained
    /// document and the evicted names.
    pub async fn prune(
        &self,
        mut index: ArchiveIndex,
        store: &SnapshotStore,
    ) -> (ArchiveIndex, Vec<String>) {
        let evicted = index.take_evicted();
        let mut names = Vec::with_capacity(evicted.len());
        for entry in evicted {
            store.remove_quietly(&entry.name).await;
            info!("Evicted backup '{}' ({})", entry.name, entry.timestamp);
            names.push(entry.name);
        }
        (index, names)
    }

    /// Entries newest first, the first flagged as latest.
    ///
    /// Counts and size are left out unless `detailed`.
    pub async fn list(&self, detailed: bool) -> Result<Vec<BackupView>> {
        let index = self.load().await?;
        Ok(index
            .newest_first()
            .into_iter()
            .enumerate()
            .map(|(i, entry)| BackupView::from_entry(entry, i == 0, detailed))
            .collect())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<BackupEntry> {
        self.load()
            .await?
            .find(name)
            .cloned()
            .ok_or_else(|| BackupError::not_found(name))
    }
}
