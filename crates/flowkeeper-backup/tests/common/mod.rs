//! Shared fixtures for archive integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use camino::Utf8PathBuf;
use flowkeeper_backup::{BackupError, BackupManager, FlowPayload, FlowSource, FlowTarget};
use flowkeeper_core::{BackupConfig, BackupPaths};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// In-memory stand-in for a running Node-RED instance
pub struct MemoryFlows {
    flows: Mutex<Value>,
    offline: AtomicBool,
}

impl MemoryFlows {
    pub fn new(flows: Value) -> Arc<Self> {
        Arc::new(Self {
            flows: Mutex::new(flows),
            offline: AtomicBool::new(false),
        })
    }

    pub fn set(&self, flows: Value) {
        *self.flows.lock().unwrap() = flows;
    }

    pub fn current(&self) -> Value {
        self.flows.lock().unwrap().clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlowSource for MemoryFlows {
    async fn fetch_current_flows(&self) -> flowkeeper_backup::Result<Value> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackupError::Source("connection refused".to_string()));
        }
        Ok(self.current())
    }
}

#[async_trait]
impl FlowTarget for MemoryFlows {
    async fn deploy_flows(&self, flows: &FlowPayload) -> flowkeeper_backup::Result<()> {
        self.set(flows.to_value());
        Ok(())
    }
}

/// A scratch archive wired to an in-memory flow source
pub struct Fixture {
    pub temp: TempDir,
    pub paths: BackupPaths,
    pub flows: Arc<MemoryFlows>,
    pub manager: BackupManager,
}

impl Fixture {
    pub fn new(max_backups: usize, auto_cleanup: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join(".flow-backups")).unwrap();
        let paths = BackupPaths::for_backup_dir(dir);
        let flows = MemoryFlows::new(sample_flows("Flow 1"));
        let manager = build_manager(&paths, max_backups, auto_cleanup, flows.clone());
        Self {
            temp,
            paths,
            flows,
            manager,
        }
    }

    /// A second manager over the same directory with different settings
    pub fn reopen(&self, max_backups: usize, auto_cleanup: bool) -> BackupManager {
        build_manager(&self.paths, max_backups, auto_cleanup, self.flows.clone())
    }

    pub fn snapshot_path(&self, name: &str) -> Utf8PathBuf {
        self.paths.snapshot_file(name)
    }

    pub fn read_json(&self, path: &Utf8PathBuf) -> Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    pub fn write_json(&self, path: &Utf8PathBuf, value: &Value) {
        std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }
}

pub fn build_manager(
    paths: &BackupPaths,
    max_backups: usize,
    auto_cleanup: bool,
    flows: Arc<MemoryFlows>,
) -> BackupManager {
    let config = BackupConfig {
        backup_path: None,
        max_backups,
        auto_cleanup,
    };
    BackupManager::new(paths.clone(), &config, flows)
}

/// Two tabs, a subflow, three nodes and a config node
pub fn sample_flows(label: &str) -> Value {
    json!([
        {"id": "t1", "type": "tab", "label": label, "disabled": false, "info": ""},
        {"id": "t2", "type": "tab", "label": "Flow 2"},
        {"id": "sf1", "type": "subflow", "name": "Retry", "in": [], "out": []},
        {"id": "n1", "type": "inject", "z": "t1", "repeat": "60", "wires": [["n2"]]},
        {"id": "n2", "type": "function", "z": "t1", "func": "return msg;", "wires": [["n3"]]},
        {"id": "n3", "type": "debug", "z": "t1", "active": true, "wires": []},
        {"id": "b1", "type": "mqtt-broker", "broker": "localhost", "port": 1883}
    ])
}
