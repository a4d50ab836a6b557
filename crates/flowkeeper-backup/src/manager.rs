//! Backup orchestration
//!
//! [`BackupManager`] composes the integrity codec, snapshot store and metadata
//! index. Each call is independent: it re-reads the index, does its work and
//! writes the index back. Mutating calls hold the archive lock for the whole
//! read-modify-write so two processes sharing a backup directory serialize.

use crate::element::FlowPayload;
use crate::error::{BackupError, Result};
use crate::health::HealthThresholds;
use crate::index::{ArchiveIndex, BackupEntry, BackupView, IndexConfig, MetadataIndex};
use crate::integrity::{analyze, verify};
use crate::lock::ArchiveLock;
use crate::naming::{
    check_format, generate_name, validate_name, AUTO_NAME_PREFIX, PRE_RESTORE_PREFIX,
};
use crate::snapshot::{SnapshotMetadata, SnapshotRecord, SnapshotStore};
use crate::source::{FlowSource, FlowTarget};
use chrono::Utc;
use flowkeeper_core::{BackupConfig, BackupPaths};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Reason recorded when the caller gives none
pub const DEFAULT_REASON: &str = "Manual backup";

/// Result of a restore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    /// Snapshot that was deployed
    pub restored: SnapshotMetadata,
    /// Backup of the flows that were replaced, if one was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_backup: Option<BackupEntry>,
    /// Number of flow elements deployed
    pub elements: usize,
}

/// Result of an index configuration migration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub previous: IndexConfig,
    pub current: IndexConfig,
    /// Backups evicted to fit the new capacity
    pub evicted: Vec<String>,
}

/// Front door to the backup archive
pub struct BackupManager {
    pub(crate) paths: BackupPaths,
    pub(crate) index: MetadataIndex,
    pub(crate) store: SnapshotStore,
    pub(crate) thresholds: HealthThresholds,
    source: Arc<dyn FlowSource>,
}

impl BackupManager {
    /// `config` seeds the index the first time the archive is used.
    pub fn new(paths: BackupPaths, config: &BackupConfig, source: Arc<dyn FlowSource>) -> Self {
        Self {
            index: MetadataIndex::new(paths.clone(), IndexConfig::from(config)),
            store: SnapshotStore::new(paths.clone()),
            thresholds: HealthThresholds::default(),
            paths,
            source,
        }
    }

    /// Override the limits used for health advisories.
    pub fn with_health_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn paths(&self) -> &BackupPaths {
        &self.paths
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub(crate) async fn lock(&self) -> Result<ArchiveLock> {
        ArchiveLock::acquire(&self.paths.lock_file()).await
    }

    pub(crate) fn config_drift(&self, index: &ArchiveIndex) -> Option<(IndexConfig, IndexConfig)> {
        let configured = self.index.defaults();
        (index.config != configured).then_some((index.config, configured))
    }

    fn warn_on_config_drift(&self, index: &ArchiveIndex) {
        if let Some((stored, configured)) = self.config_drift(index) {
            warn!(
                "Backup index keeps max {} backups (auto-cleanup {}) but configuration asks for {} ({}); run a config migration to apply it",
                stored.max_backups, stored.auto_cleanup, configured.max_backups, configured.auto_cleanup
            );
        }
    }

    /// Snapshot the current flows.
    ///
    /// The index is written only after the snapshot file, so a failure never
    /// leaves an index entry without a file. A failed index write can leave an
    /// orphaned file, which the health check adopts.
    pub async fn create(&self, name: Option<&str>, reason: Option<&str>) -> Result<BackupEntry> {
        self.index.ensure_initialized().await?;

        let raw = self.source.fetch_current_flows().await?;

        let timestamp = Utc::now();
        let name = match name {
            Some(name) => {
                validate_name(name)?;
                name.to_string()
            }
            None => generate_name(AUTO_NAME_PREFIX, timestamp),
        };

        let payload = FlowPayload::from_value(raw)?;
        let stats = analyze(&payload)?;

        let entry = BackupEntry {
            filename: BackupPaths::snapshot_filename(&name),
            name,
            timestamp,
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_REASON)
                .to_string(),
            checksum: stats.checksum,
            flows_count: stats.flows_count,
            nodes_count: stats.nodes_count,
            size: stats.size,
        };

        let _lock = self.lock().await?;
        let index = self.index.load().await?;
        self.warn_on_config_drift(&index);

        if index.contains(&entry.name) || self.store.exists(&entry.name).await {
            return Err(BackupError::duplicate(&entry.name));
        }

        self.store
            .write(&SnapshotRecord {
                metadata: SnapshotMetadata::from(&entry),
                flows: payload,
            })
            .await?;

        let index = self.index.append(index, entry.clone())?;
        let (index, evicted) = self.index.prune(index, &self.store).await;
        if let Err(e) = self.index.save(&index).await {
            warn!(
                "Snapshot '{}' was written but the index update failed; the health check will adopt it",
                entry.name
            );
            return Err(e);
        }

        info!(
            "Created backup '{}' ({} flows, {} nodes, {} bytes{})",
            entry.name,
            entry.flows_count,
            entry.nodes_count,
            entry.size,
            if evicted.is_empty() {
                String::new()
            } else {
                format!(", evicted {}", evicted.join(", "))
            }
        );
        Ok(entry)
    }

    /// Backups newest first.
    pub async fn list(&self, detailed: bool) -> Result<Vec<BackupView>> {
        self.index.ensure_initialized().await?;
        self.index.list(detailed).await
    }

    /// Load a snapshot and prove it intact.
    ///
    /// The payload is checked against the index checksum when the backup is
    /// indexed, otherwise against the checksum embedded in the file.
    pub async fn fetch(&self, name: &str) -> Result<SnapshotRecord> {
        check_format(name)?;
        self.index.ensure_initialized().await?;

        let record = self.store.read(name).await?;
        if record.metadata.name != name {
            return Err(BackupError::corrupted(
                name,
                format!("snapshot file is labelled '{}'", record.metadata.name),
            ));
        }

        let index = self.index.load().await?;
        let expected = match index.find(name) {
            Some(entry) => {
                if entry.checksum != record.metadata.checksum {
                    return Err(BackupError::corrupted(
                        name,
                        "checksum in snapshot file does not match the index",
                    ));
                }
                entry.checksum.clone()
            }
            None => record.metadata.checksum.clone(),
        };

        if !verify(&record.flows, &expected) {
            return Err(BackupError::corrupted(name, "payload checksum mismatch"));
        }

        Ok(record)
    }

    /// Remove a backup from the index and delete its file.
    pub async fn delete(&self, name: &str) -> Result<BackupEntry> {
        check_format(name)?;
        self.index.ensure_initialized().await?;

        let _lock = self.lock().await?;
        let mut index = self.index.load().await?;
        let entry = index
            .remove(name)
            .ok_or_else(|| BackupError::not_found(name))?;
        self.index.save(&index).await?;
        self.store.remove_quietly(name).await;

        info!("Deleted backup '{}'", name);
        Ok(entry)
    }

    /// Deploy a verified snapshot to `target`.
    ///
    /// With `safety_backup`, the flows about to be replaced are backed up first.
    pub async fn restore(
        &self,
        name: &str,
        target: &dyn FlowTarget,
        safety_backup: bool,
    ) -> Result<RestoreOutcome> {
        let record = self.fetch(name).await?;

        let safety = if safety_backup {
            let safety_name = generate_name(PRE_RESTORE_PREFIX, Utc::now());
            let reason = format!("Safety backup before restoring {}", name);
            Some(self.create(Some(&safety_name), Some(&reason)).await?)
        } else {
            None
        };

        target.deploy_flows(&record.flows).await?;
        info!(
            "Restored backup '{}' ({} elements)",
            name,
            record.flows.len()
        );

        Ok(RestoreOutcome {
            elements: record.flows.len(),
            restored: record.metadata,
            safety_backup: safety,
        })
    }

    /// Rewrite the capacity settings stored in the index.
    ///
    /// Stored settings are otherwise fixed when the index is first created.
    /// Lowering the capacity prunes immediately when auto-cleanup is on.
    pub async fn migrate_config(&self, config: IndexConfig) -> Result<MigrationOutcome> {
        if config.max_backups == 0 {
            return Err(BackupError::InvalidConfig(
                "maxBackups must be at least 1".to_string(),
            ));
        }
        self.index.ensure_initialized().await?;

        let _lock = self.lock().await?;
        let mut index = self.index.load().await?;
        let previous = index.config;
        index.config = config;
        let (index, evicted) = self.index.prune(index, &self.store).await;
        self.index.save(&index).await?;

        info!(
            "Migrated backup index config: max {} -> {}, auto-cleanup {} -> {}",
            previous.max_backups, config.max_backups, previous.auto_cleanup, config.auto_cleanup
        );
        Ok(MigrationOutcome {
            previous,
            current: config,
            evicted,
        })
    }
}
