//! Checksums and summary statistics for flow payloads.
//!
//! The checksum is SHA-256 over the canonical serialization: compact JSON
//! with object keys in lexicographic order at every depth. Keys are sorted
//! explicitly rather than relying on the map type `serde_json` was built with,
//! so checksums do not change if a dependency enables `preserve_order`.

use crate::element::{ElementKind, FlowPayload};
use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hash algorithm recorded alongside checksums
pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// Derived statistics for a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStats {
    /// Hex-encoded SHA-256 of the canonical serialization
    pub checksum: String,
    /// Number of tabs
    pub flows_count: usize,
    /// Number of typed elements that are neither tabs nor subflows
    pub nodes_count: usize,
    /// Byte length of the canonical serialization
    pub size: u64,
}

/// Serialize a payload canonically.
pub fn canonical_bytes(payload: &FlowPayload) -> Result<Vec<u8>> {
    let canonical = canonicalize(&payload.to_value());
    serde_json::to_vec(&canonical).map_err(|e| BackupError::serialization("flow payload", e))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute checksum and counts for a payload.
pub fn analyze(payload: &FlowPayload) -> Result<FlowStats> {
    let bytes = canonical_bytes(payload)?;

    let mut flows_count = 0;
    let mut nodes_count = 0;
    for element in payload.elements() {
        match element.kind() {
            ElementKind::Tab => flows_count += 1,
            ElementKind::Node(_) => nodes_count += 1,
            ElementKind::Subflow | ElementKind::Untyped => {}
        }
    }

    Ok(FlowStats {
        checksum: digest_hex(&bytes),
        flows_count,
        nodes_count,
        size: bytes.len() as u64,
    })
}

/// Check a payload against a previously computed checksum.
pub fn verify(payload: &FlowPayload, expected_checksum: &str) -> bool {
    match canonical_bytes(payload) {
        Ok(bytes) => digest_hex(&bytes).eq_ignore_ascii_case(expected_checksum),
        Err(_) => false,
    }
}
