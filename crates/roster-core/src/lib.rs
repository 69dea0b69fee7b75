//! Roster Core - shared types for the rostersync engine
//!
//! This crate provides the fundamental types used across the rostersync
//! workspace:
//! - Identifier and runtime value types
//! - Rule, condition and match record definitions
//! - Subject and group definitions
//! - The structured query model produced by condition behaviors
//! - Domain event definitions

pub mod condition;
pub mod error;
pub mod event;
pub mod group;
pub mod matching;
pub mod query;
pub mod rule;
pub mod subject;
pub mod types;

// Re-export commonly used types
pub use condition::{ConditionRecord, ConfigMap};
pub use error::{FieldError, QueryError};
pub use event::{DomainEvent, EventKind};
pub use group::Group;
pub use matching::{MatchRecord, MatchStatus};
pub use query::{
    AliasAllocator, Bindings, FieldRef, Join, JoinSource, Predicate, QueryFragment, SubjectQuery,
    TextOp,
};
pub use rule::Rule;
pub use subject::{CustomFieldDef, FieldDatatype, Subject};
pub use types::{ConditionId, GroupId, RuleId, SubjectId, Value};
