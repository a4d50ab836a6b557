//! Tool surface for a tool-calling host
//!
//! Each operation takes and returns plain structured data. Failures come back
//! inside a [`ToolResult`] with a stable error code, so one failed call never
//! takes the host down.

use crate::error::Result;
use crate::index::{BackupView, IndexConfig};
use crate::manager::BackupManager;
use crate::source::FlowTarget;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Names accepted by [`BackupTools::call`]
pub const TOOL_NAMES: &[&str] = &[
    "create_backup",
    "list_backups",
    "get_backup_flows",
    "backup_health",
    "delete_backup",
    "restore_backup",
    "migrate_backup_config",
];

/// Failure details returned to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
}

/// Outcome of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ToolError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    fn from_result<T: Serialize>(tool: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(data) => Self::ok(data),
                Err(e) => Self::failure("Serialization", e.to_string()),
            },
            Err(e) => {
                warn!("{} failed: {}", tool, e);
                Self::failure(e.code(), e.to_string())
            }
        }
    }

    /// Error code, if the call failed
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBackupArgs {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListBackupsArgs {
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestoreBackupArgs {
    pub name: String,
    #[serde(default = "default_true")]
    pub safety_backup: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MigrateConfigArgs {
    pub max_backups: usize,
    #[serde(default = "default_true")]
    pub auto_cleanup: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct BackupListing {
    count: usize,
    backups: Vec<BackupView>,
}

/// Tool handlers backed by a [`BackupManager`]
pub struct BackupTools {
    manager: BackupManager,
    target: Option<Arc<dyn FlowTarget>>,
}

impl BackupTools {
    pub fn new(manager: BackupManager) -> Self {
        Self {
            manager,
            target: None,
        }
    }

    /// Enable `restore_backup` by giving it somewhere to deploy flows.
    pub fn with_target(mut self, target: Arc<dyn FlowTarget>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn manager(&self) -> &BackupManager {
        &self.manager
    }

    pub async fn create_backup(&self, args: CreateBackupArgs) -> ToolResult {
        let result = self
            .manager
            .create(args.name.as_deref(), args.reason.as_deref())
            .await;
        ToolResult::from_result("create_backup", result)
    }

    pub async fn list_backups(&self, args: ListBackupsArgs) -> ToolResult {
        let result = self
            .manager
            .list(args.detailed)
            .await
            .map(|backups| BackupListing {
                count: backups.len(),
                backups,
            });
        ToolResult::from_result("list_backups", result)
    }

    /// Returns `{ metadata, flows }` after checksum verification.
    pub async fn get_backup_flows(&self, args: NameArgs) -> ToolResult {
        let result = self.manager.fetch(&args.name).await;
        ToolResult::from_result("get_backup_flows", result)
    }

    pub async fn backup_health(&self) -> ToolResult {
        let report = self.manager.health().await;
        ToolResult::from_result("backup_health", Ok(report))
    }

    pub async fn delete_backup(&self, args: NameArgs) -> ToolResult {
        let result = self.manager.delete(&args.name).await;
        ToolResult::from_result("delete_backup", result)
    }

    pub async fn restore_backup(&self, args: RestoreBackupArgs) -> ToolResult {
        let Some(target) = &self.target else {
            return ToolResult::failure("Unsupported", "No flow target is configured for restore");
        };
        let result = self
            .manager
            .restore(&args.name, target.as_ref(), args.safety_backup)
            .await;
        ToolResult::from_result("restore_backup", result)
    }

    pub async fn migrate_backup_config(&self, args: MigrateConfigArgs) -> ToolResult {
        let result = self
            .manager
            .migrate_config(IndexConfig {
                max_backups: args.max_backups,
                auto_cleanup: args.auto_cleanup,
            })
            .await;
        ToolResult::from_result("migrate_backup_config", result)
    }

    /// Dispatch a call by tool name with JSON arguments.
    pub async fn call(&self, tool: &str, args: Value) -> ToolResult {
        match tool {
            "create_backup" => match parse_args(args) {
                Ok(args) => self.create_backup(args).await,
                Err(failure) => failure,
            },
            "list_backups" => match parse_args(args) {
                Ok(args) => self.list_backups(args).await,
                Err(failure) => failure,
            },
            "get_backup_flows" => match parse_args(args) {
                Ok(args) => self.get_backup_flows(args).await,
                Err(failure) => failure,
            },
            "backup_health" => self.backup_health().await,
            "delete_backup" => match parse_args(args) {
                Ok(args) => self.delete_backup(args).await,
                Err(failure) => failure,
            },
            "restore_backup" => match parse_args(args) {
                Ok(args) => self.restore_backup(args).await,
                Err(failure) => failure,
            },
            "migrate_backup_config" => match parse_args(args) {
                Ok(args) => self.migrate_backup_config(args).await,
                Err(failure) => failure,
            },
            other => ToolResult::failure(
                "UnknownTool",
                format!("Unknown tool '{}'. Available: {}", other, TOOL_NAMES.join(", ")),
            ),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> std::result::Result<T, ToolResult> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| ToolResult::failure("InvalidArguments", e.to_string()))
}
