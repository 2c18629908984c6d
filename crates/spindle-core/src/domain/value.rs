//! TaskValue: the values exchanged with callables.

use serde::{Deserialize, Serialize};

/// An object living in the persistent storage layer.
///
/// Mutations are propagated by the storage itself; the worker never
/// re-serializes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentObject {
    pub id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PersistentObject {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A decoded argument value or a task output value.
///
/// `Null` doubles as the placeholder for outputs that were never produced
/// (timeout / application exception).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum TaskValue {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f64),
    Str(String),
    Object(serde_json::Value),
    Persistent(PersistentObject),
}

impl TaskValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TaskValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TaskValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view over both native and extended-width lanes.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TaskValue::Int(v) => Some(i64::from(*v)),
            TaskValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_persistent(&self) -> Option<&PersistentObject> {
        match self {
            TaskValue::Persistent(p) => Some(p),
            _ => None,
        }
    }
}

impl From<i32> for TaskValue {
    fn from(v: i32) -> Self {
        TaskValue::Int(v)
    }
}

impl From<bool> for TaskValue {
    fn from(v: bool) -> Self {
        TaskValue::Bool(v)
    }
}

impl From<f64> for TaskValue {
    fn from(v: f64) -> Self {
        TaskValue::Float(v)
    }
}

impl From<&str> for TaskValue {
    fn from(v: &str) -> Self {
        TaskValue::Str(v.to_string())
    }
}

impl From<String> for TaskValue {
    fn from(v: String) -> Self {
        TaskValue::Str(v)
    }
}
