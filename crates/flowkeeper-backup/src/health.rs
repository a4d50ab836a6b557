//! Archive health check
//!
//! Re-verifies every snapshot, adopts orphaned snapshot files left behind by a
//! failed index write, and raises advisories for stale, full or oversized
//! archives. Only corruption, missing files and initialization failures make
//! the archive unhealthy; advisories do not.

use crate::error::Result;
use crate::index::BackupEntry;
use crate::integrity::verify;
use crate::manager::BackupManager;
use crate::naming::validate_name;
use chrono::Utc;
use flowkeeper_core::human_bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Age of the newest backup after which an advisory is raised
pub const STALE_AFTER_MINUTES: i64 = 24 * 60;

/// Fraction of capacity at which an advisory is raised
pub const CAPACITY_WARNING_RATIO: f64 = 0.9;

/// Total archive size above which an advisory is raised
pub const SIZE_WARNING_BYTES: u64 = 100 * 1024 * 1024;

/// Limits at which the health check raises advisories
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub stale_after_minutes: i64,
    pub capacity_warning_ratio: f64,
    pub size_warning_bytes: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            stale_after_minutes: STALE_AFTER_MINUTES,
            capacity_warning_ratio: CAPACITY_WARNING_RATIO,
            size_warning_bytes: SIZE_WARNING_BYTES,
        }
    }
}

/// Health check outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub backup_dir: String,
    pub backup_count: usize,
    pub max_backups: usize,
    pub auto_cleanup: bool,
    pub corrupted_count: usize,
    pub missing_count: usize,
    pub total_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_age_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adopted_orphans: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    fn empty(backup_dir: String) -> Self {
        Self {
            healthy: true,
            backup_dir,
            backup_count: 0,
            max_backups: 0,
            auto_cleanup: false,
            corrupted_count: 0,
            missing_count: 0,
            total_size_bytes: 0,
            latest_backup: None,
            latest_age_minutes: None,
            adopted_orphans: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    fn failed(mut self, issue: String, recommendation: String) -> Self {
        self.healthy = false;
        self.issues.push(issue);
        self.recommendations.push(recommendation);
        self
    }
}

/// Orphans found during reconciliation
#[derive(Debug, Default)]
struct Reconciliation {
    adopted: Vec<String>,
    rejected: Vec<(String, String)>,
}

impl BackupManager {
    /// Assess the archive. Never fails; problems are reported in the result.
    ///
    /// The only write is adding adopted orphans to the index. Nothing is
    /// evicted or deleted here, even when adoption pushes the archive over
    /// capacity; the next `create` or config migration prunes.
    pub async fn health(&self) -> HealthReport {
        let report = HealthReport::empty(self.paths.backup_dir.to_string());

        if let Err(e) = self.index.ensure_initialized().await {
            return report.failed(
                format!("Backup system initialization failed: {}", e),
                format!(
                    "Check that {} exists and is writable",
                    self.paths.backup_dir
                ),
            );
        }

        let reconciliation = match self.reconcile_orphans().await {
            Ok(r) => r,
            Err(e) => {
                return report.failed(
                    format!("Backup index could not be read: {}", e),
                    "Inspect or remove the backup index so it can be rebuilt".to_string(),
                )
            }
        };

        let index = match self.index.load().await {
            Ok(index) => index,
            Err(e) => {
                return report.failed(
                    format!("Backup index could not be read: {}", e),
                    "Inspect or remove the backup index so it can be rebuilt".to_string(),
                )
            }
        };

        let mut report = HealthReport {
            backup_count: index.len(),
            max_backups: index.config.max_backups,
            auto_cleanup: index.config.auto_cleanup,
            adopted_orphans: reconciliation.adopted.clone(),
            ..report
        };

        if !reconciliation.adopted.is_empty() {
            report.issues.push(format!(
                "Adopted {} orphaned snapshot file(s) into the index: {}",
                reconciliation.adopted.len(),
                reconciliation.adopted.join(", ")
            ));
        }
        for (name, reason) in &reconciliation.rejected {
            report.issues.push(format!(
                "Orphaned snapshot file '{}' was not adopted: {}",
                name, reason
            ));
        }

        if let Some((stored, configured)) = self.config_drift(&index) {
            report.issues.push(format!(
                "Stored capacity settings (max {}, auto-cleanup {}) differ from configuration (max {}, auto-cleanup {})",
                stored.max_backups, stored.auto_cleanup, configured.max_backups, configured.auto_cleanup
            ));
            report
                .recommendations
                .push("Run a config migration to apply the configured capacity".to_string());
        }

        if index.is_empty() {
            report.healthy = false;
            report.issues.push("No backups found".to_string());
            report
                .recommendations
                .push("Create your first backup to protect your flows".to_string());
            return report;
        }

        for entry in &index.backups {
            self.check_entry(entry, &mut report).await;
        }

        if report.missing_count > 0 {
            report.healthy = false;
            report.issues.push(format!(
                "{} backup file(s) missing from disk",
                report.missing_count
            ));
            report
                .recommendations
                .push("Delete the missing backups from the index and create a fresh backup".to_string());
        }

        if report.corrupted_count > 0 {
            report.healthy = false;
            report.issues.push(format!(
                "{} corrupted backup(s) found",
                report.corrupted_count
            ));
            report
                .recommendations
                .push("Delete the corrupted backups and create a fresh backup".to_string());
        }

        if let Some(latest) = index.latest() {
            let age_minutes = (Utc::now() - latest.timestamp).num_minutes();
            report.latest_backup = Some(latest.name.clone());
            report.latest_age_minutes = Some(age_minutes);

            if age_minutes > self.thresholds.stale_after_minutes {
                report.issues.push(format!(
                    "Latest backup is {} hours old",
                    age_minutes / 60
                ));
                report
                    .recommendations
                    .push("Create a new backup; the latest one is more than a day old".to_string());
            }
        }

        let capacity = index.config.max_backups as f64;
        if index.len() > index.config.max_backups {
            report.issues.push(format!(
                "Backup count ({}) exceeds the limit ({})",
                index.len(),
                index.config.max_backups
            ));
            report.recommendations.push(if index.config.auto_cleanup {
                "The oldest backups will be evicted by the next backup".to_string()
            } else {
                "Delete old backups or enable auto-cleanup".to_string()
            });
        } else if index.len() as f64 >= capacity * self.thresholds.capacity_warning_ratio {
            report.issues.push(format!(
                "Backup count ({}) is approaching the limit ({})",
                index.len(),
                index.config.max_backups
            ));
            report.recommendations.push(if index.config.auto_cleanup {
                "Oldest backups will be evicted automatically; raise maxBackups to keep more history"
                    .to_string()
            } else {
                "Delete old backups or enable auto-cleanup".to_string()
            });
        }

        if report.total_size_bytes > self.thresholds.size_warning_bytes {
            report.issues.push(format!(
                "Backups use {} of disk space",
                human_bytes(report.total_size_bytes)
            ));
            report
                .recommendations
                .push("Lower maxBackups or delete large backups".to_string());
        }

        report
    }

    async fn check_entry(&self, entry: &BackupEntry, report: &mut HealthReport) {
        match self.store.file_size(&entry.name).await {
            Ok(Some(size)) => report.total_size_bytes += size,
            Ok(None) => {
                warn!("Backup '{}' has no snapshot file", entry.name);
                report.missing_count += 1;
                return;
            }
            Err(e) => {
                warn!("Cannot stat backup '{}': {}", entry.name, e);
                report.corrupted_count += 1;
                return;
            }
        }

        match self.store.read(&entry.name).await {
            Ok(record) if verify(&record.flows, &entry.checksum) => {}
            Ok(_) => {
                warn!("Backup '{}' fails checksum verification", entry.name);
                report.corrupted_count += 1;
            }
            Err(e) => {
                warn!("Backup '{}' cannot be read: {}", entry.name, e);
                report.corrupted_count += 1;
            }
        }
    }

    /// Bring snapshot files that have no index entry back under management.
    ///
    /// A file is adopted when its embedded metadata names it, the name is
    /// valid and the payload matches the embedded checksum. Anything else is
    /// reported and left on disk.
    async fn reconcile_orphans(&self) -> Result<Reconciliation> {
        let mut result = Reconciliation::default();

        let on_disk = self.store.list_names().await?;
        let index = self.index.load().await?;
        if on_disk.iter().all(|name| index.contains(name)) {
            return Ok(result);
        }

        let _lock = self.lock().await?;
        let mut index = self.index.load().await?;

        for name in on_disk {
            if index.contains(&name) {
                continue;
            }
            if let Err(e) = validate_name(&name) {
                result.rejected.push((name, e.to_string()));
                continue;
            }
            let record = match self.store.read(&name).await {
                Ok(record) => record,
                Err(e) => {
                    result.rejected.push((name, e.to_string()));
                    continue;
                }
            };
            if record.metadata.name != name {
                result.rejected.push((
                    name,
                    format!("file is labelled '{}'", record.metadata.name),
                ));
                continue;
            }
            if !verify(&record.flows, &record.metadata.checksum) {
                result
                    .rejected
                    .push((name, "payload checksum mismatch".to_string()));
                continue;
            }

            index.append(BackupEntry::from_metadata(&record.metadata))?;
            info!("Adopted orphaned snapshot '{}'", name);
            result.adopted.push(name);
        }

        if !result.adopted.is_empty() {
            self.index.save(&index).await?;
        }

        Ok(result)
    }
}
