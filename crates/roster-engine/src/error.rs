//! Engine error types

use roster_core::{GroupId, RuleId};
use roster_store::StoreError;
use thiserror::Error;

/// Engine error
///
/// Only integrity violations on the administrative save path and
/// infrastructure failures surface here; evaluation problems are
/// converted into broken-rule state instead (see the evaluator).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The referenced rule does not exist.
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    /// The referenced target group does not exist.
    #[error("Target group not found: {0}")]
    GroupNotFound(GroupId),

    /// The target group is already reserved for a different rule.
    /// Reservations are exclusive.
    #[error("Group {group_id} is already managed by rule {rule_id}")]
    GroupAlreadyManaged { group_id: GroupId, rule_id: RuleId },

    /// The target group carries another component's ownership marker.
    #[error("Group {0} is owned by another component")]
    GroupUnavailable(GroupId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
