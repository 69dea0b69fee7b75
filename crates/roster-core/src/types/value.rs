//! Runtime value type for condition configuration and query bindings

use serde::{Deserialize, Serialize};

use crate::types::ids::GroupId;

/// Runtime value used in condition configuration blobs and query
/// parameter bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
    /// List of values
    List(Vec<Value>),
}

impl Value {
    /// Borrow as a string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read as an integer, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as a list, if this is a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Read a list of integers as group identifiers.
    ///
    /// Returns `None` when this is not a list or any element is not an
    /// integer.
    pub fn as_group_ids(&self) -> Option<Vec<GroupId>> {
        self.as_list()?
            .iter()
            .map(|v| v.as_int().map(GroupId))
            .collect()
    }

    /// Build a list value out of group identifiers.
    pub fn from_group_ids(ids: &[GroupId]) -> Value {
        Value::List(ids.iter().map(|id| Value::Int(id.0)).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
