//! Flowkeeper Backup Archive
//!
//! A local, checksum-verified, capacity-bounded archive of flow configuration
//! snapshots.
//!
//! # Layout
//!
//! Inside the backup directory:
//! - `backup_metadata.json`: the index, one entry per snapshot plus the
//!   archive capacity settings
//! - `<name>.json`: one file per snapshot holding its metadata and full payload
//!
//! # Guarantees
//!
//! - **Integrity**: every snapshot carries a SHA-256 checksum of its canonical
//!   serialization, verified on every fetch and by the health check
//! - **Bounded size**: with auto-cleanup, the oldest snapshots are evicted once
//!   the configured capacity is exceeded
//! - **Serialized writers**: index mutations run under an exclusive file lock
//! - **Self-assessment**: [`BackupManager::health`] re-verifies every snapshot
//!   and adopts snapshot files orphaned by a failed index write
//!
//! # Examples
//!
//! ```no_run
//! use flowkeeper_backup::{BackupManager, FileFlowSource};
//! use flowkeeper_core::{BackupConfig, BackupPaths, PathInputs, FlowkeeperConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> flowkeeper_backup::Result<()> {
//!     let config = FlowkeeperConfig::default();
//!     let paths = BackupPaths::resolve(&PathInputs::gather(&config));
//!     let source = Arc::new(FileFlowSource::new(paths.live_flow_file.clone()));
//!     let manager = BackupManager::new(paths, &BackupConfig::default(), source);
//!
//!     let entry = manager.create(Some("before-upgrade"), Some("Node-RED 4 upgrade")).await?;
//!     println!("Backed up {} nodes", entry.nodes_count);
//!
//!     let record = manager.fetch("before-upgrade").await?;
//!     println!("Verified {} elements", record.flows.len());
//!     Ok(())
//! }
//! ```

pub mod element;
pub mod error;
mod fsutil;
pub mod health;
pub mod index;
pub mod integrity;
pub mod lock;
pub mod manager;
pub mod naming;
pub mod snapshot;
pub mod source;
pub mod tools;

// Re-export commonly used types
pub use element::{ElementKind, FlowElement, FlowPayload};
pub use error::{BackupError, Result};
pub use health::{HealthReport, HealthThresholds};
pub use index::{ArchiveIndex, BackupEntry, BackupView, IndexConfig, MetadataIndex, INDEX_VERSION};
pub use integrity::{analyze, verify, FlowStats};
pub use manager::{BackupManager, MigrationOutcome, RestoreOutcome, DEFAULT_REASON};
pub use snapshot::{SnapshotMetadata, SnapshotRecord, SnapshotStore};
pub use source::{FileFlowSource, FlowSource, FlowTarget};
pub use tools::{BackupTools, ToolError, ToolResult, TOOL_NAMES};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
