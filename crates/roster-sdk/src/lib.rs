//! Roster SDK - high-level API for the rostersync engine
//!
//! Build a [`RosterSync`] with [`RosterSyncBuilder`], then drive it:
//! save rules through the administrative path, run full sweeps or
//! single-rule re-evaluations, feed it domain events for incremental
//! updates, and read the display projections.
//!
//! ```
//! use roster_sdk::{RosterSyncBuilder, RuleDraft};
//! use roster_sdk::{Group, GroupId, GroupStore, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! store.save_group(&Group::new(GroupId(1), "Staff")).await?;
//!
//! let service = RosterSyncBuilder::new()
//!     .with_memory_store(store)
//!     .build();
//!
//! let rule = service.save_rule(&RuleDraft::create("Staff roster", GroupId(1))).await?;
//! service.set_rule_enabled(rule.id, true).await?;
//! service.evaluate_and_sync(rule.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod roster_sync;

// Re-export main types
pub use builder::RosterSyncBuilder;
pub use error::{Result, SdkError};
pub use roster_sync::{RosterSync, SweepReport};

// Re-export commonly used types from dependencies
pub use roster_core::{
    ConditionRecord, ConfigMap, DomainEvent, EventKind, FieldError, Group, GroupId, MatchStatus,
    Rule, RuleId, Subject, SubjectId, Value,
};
pub use roster_engine::{
    ConditionDescription, ConditionDraft, ConditionRegistry, EngineConfig, EngineError, RuleDraft,
    SyncOutcome,
};
pub use roster_store::{
    AuditEvent, ConditionStore, GroupStore, MatchStore, MemoryAuditLog, MemoryStore, Page,
    PageRequest, RuleStore, SubjectStore,
};
