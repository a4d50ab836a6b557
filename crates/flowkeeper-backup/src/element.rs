//! Flow element model
//!
//! A flow payload is an ordered array of JSON objects. Only the `type`, `id`
//! and `z` fields mean anything to the archive. Every other field is carried
//! untouched so a payload survives a store/fetch cycle unchanged.

use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `type` of a flow tab
pub const TAB_TYPE: &str = "tab";

/// `type` of a subflow definition
pub const SUBFLOW_TYPE: &str = "subflow";

/// Discriminator of a flow element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind<'a> {
    /// A flow tab
    Tab,
    /// A subflow definition
    Subflow,
    /// Any other typed element (nodes and config nodes)
    Node(&'a str),
    /// No string `type` field
    Untyped,
}

/// A single flow element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowElement(Map<String, Value>);

impl FlowElement {
    /// Wrap an object's fields
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Element discriminator
    pub fn kind(&self) -> ElementKind<'_> {
        match self.0.get("type").and_then(Value::as_str) {
            Some(TAB_TYPE) => ElementKind::Tab,
            Some(SUBFLOW_TYPE) => ElementKind::Subflow,
            Some(other) => ElementKind::Node(other),
            None => ElementKind::Untyped,
        }
    }

    /// Element id
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Id of the tab or subflow containing this element
    pub fn parent(&self) -> Option<&str> {
        self.0.get("z").and_then(Value::as_str)
    }

    /// Look up a type-specific field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Complete flow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowPayload(Vec<FlowElement>);

impl FlowPayload {
    /// Validate raw JSON as a flow payload.
    ///
    /// Fails with [`BackupError::InvalidPayload`] unless `value` is an array
    /// whose items are all objects.
    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(BackupError::InvalidPayload(format!(
                    "expected an array of flow elements, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let elements = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(FlowElement(fields)),
                other => Err(BackupError::InvalidPayload(format!(
                    "element {} is {}, expected an object",
                    index,
                    json_type_name(&other)
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(elements))
    }

    /// Convert back to raw JSON
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(|e| Value::Object(e.0.clone())).collect())
    }

    /// Elements in payload order
    pub fn elements(&self) -> &[FlowElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FlowElement>> for FlowPayload {
    fn from(elements: Vec<FlowElement>) -> Self {
        Self(elements)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
