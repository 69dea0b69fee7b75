//! Roster Store - storage contracts for the rostersync engine
//!
//! This crate defines the async traits the engine talks to:
//!
//! - [`RuleStore`] / [`ConditionStore`]: persisted rules and their
//!   condition records
//! - [`SubjectStore`]: the subject population, including composed-query
//!   execution
//! - [`GroupStore`]: target groups, their members and the managed-by
//!   reservation marker
//! - [`MatchStore`]: per-subject match history
//! - [`AuditSink`]: the notification side channel
//!
//! plus in-memory reference implementations of all of them, suitable
//! for tests and small deployments. The storage technology behind the
//! traits is an implementation choice; the engine only relies on the
//! contracts.

pub mod audit;
pub mod error;
pub mod memory;
mod query_exec;
pub mod traits;

pub use audit::{AuditEvent, AuditSink, MemoryAuditLog};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{
    ConditionStore, GroupStore, MatchStore, Page, PageRequest, RuleStore, SubjectStore,
};
