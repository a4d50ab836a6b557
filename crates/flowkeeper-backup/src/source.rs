//! Flow source and target collaborators
//!
//! The archive never talks to Node-RED itself. It asks a [`FlowSource`] for the
//! current flows and hands restored flows to a [`FlowTarget`].

use crate::element::FlowPayload;
use crate::error::{BackupError, Result};
use crate::fsutil::write_atomic;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::io::ErrorKind;
use tracing::info;

/// Supplies the current flow configuration
#[async_trait]
pub trait FlowSource: Send + Sync {
    /// Raw flow configuration; validated by the caller.
    async fn fetch_current_flows(&self) -> Result<Value>;
}

/// Accepts a flow configuration to deploy
#[async_trait]
pub trait FlowTarget: Send + Sync {
    async fn deploy_flows(&self, flows: &FlowPayload) -> Result<()>;
}

/// Reads and writes the flow file of a local Node-RED user directory
#[derive(Debug, Clone)]
pub struct FileFlowSource {
    path: Utf8PathBuf,
}

impl FileFlowSource {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl FlowSource for FileFlowSource {
    async fn fetch_current_flows(&self) -> Result<Value> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::Source(format!(
                    "flow file not found: {}",
                    self.path
                )))
            }
            Err(e) => return Err(BackupError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            BackupError::InvalidPayload(format!("{} is not valid JSON: {}", self.path, e))
        })
    }
}

#[async_trait]
impl FlowTarget for FileFlowSource {
    async fn deploy_flows(&self, flows: &FlowPayload) -> Result<()> {
        let json = serde_json::to_vec_pretty(flows)
            .map_err(|e| BackupError::serialization("flow payload", e))?;
        write_atomic(&self.path, &json).await?;
        info!("Wrote {} flow elements to {}", flows.len(), self.path);
        Ok(())
    }
}
