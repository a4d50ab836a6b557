//! Raw tool invocation

use anyhow::{Context, Result};
use flowkeeper_backup::BackupTools;
use serde_json::Value;

use super::emit;
use crate::cli::ToolArgs;

pub async fn run(tools: &BackupTools, args: ToolArgs) -> Result<()> {
    let params = match args.args.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("--args must be valid JSON")?,
        None => Value::Null,
    };
    let result = tools.call(&args.tool, params).await;
    emit(&args.tool, result)
}
