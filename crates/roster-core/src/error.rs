//! Error types shared across the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while executing a composed subject query.
///
/// These surface at the evaluation boundary and are converted into a
/// broken-rule transition by the evaluator, never propagated further.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A predicate referenced a parameter binding that was never merged
    /// into the composed query.
    #[error("Unknown binding: {0}")]
    UnknownBinding(String),

    /// A predicate referenced a join alias with no matching join clause.
    #[error("Unknown join alias: {0}")]
    UnknownAlias(String),

    /// A compare predicate targeted a field the subject population does
    /// not carry.
    #[error("Unsupported field: {0}")]
    UnsupportedField(String),

    /// A binding held a value of the wrong shape.
    #[error("Invalid binding value for {name}: expected {expected}")]
    InvalidBinding {
        name: String,
        expected: &'static str,
    },
}

/// A field-level configuration validation error.
///
/// Reported back to the configuration-editing caller, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The configuration field the error is about.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
