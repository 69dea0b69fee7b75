//! Storage error types

use roster_core::{ConditionId, GroupId, QueryError, RuleId};
use thiserror::Error;

/// Storage error
#[derive(Error, Debug)]
pub enum StoreError {
    /// Rule does not exist
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    /// Condition record does not exist
    #[error("Condition not found: {0}")]
    ConditionNotFound(ConditionId),

    /// Group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// A composed query could not be executed
    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    /// Backend-specific failure
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
