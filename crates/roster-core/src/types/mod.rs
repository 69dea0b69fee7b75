//! Identifier and value types

mod ids;
mod value;

pub use ids::{ConditionId, GroupId, RuleId, SubjectId};
pub use value::Value;
