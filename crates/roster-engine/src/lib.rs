//! Roster Engine - rule evaluation and membership synchronization
//!
//! The algorithms behind rostersync:
//! - pluggable [`Condition`](conditions::Condition) behaviors and their
//!   [`ConditionRegistry`](registry::ConditionRegistry)
//! - the [`QueryComposer`](composer::QueryComposer) that merges
//!   condition fragments into one evaluable query
//! - the [`RuleEvaluator`](evaluator::RuleEvaluator) with its
//!   broken-state machine
//! - the [`MembershipSynchronizer`](sync::MembershipSynchronizer)
//!   applying minimal add/remove diffs to target groups
//! - the [`EventDispatcher`](dispatcher::EventDispatcher) driving
//!   incremental per-subject re-evaluation
//! - the write-invalidated [`ResultCache`](cache::ResultCache)
//! - the [`RuleManager`](manager::RuleManager) administrative save and
//!   delete path

pub mod cache;
pub mod composer;
pub mod conditions;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod manager;
pub mod registry;
pub mod sync;

pub use cache::ResultCache;
pub use composer::QueryComposer;
pub use conditions::{Condition, ConditionContext};
pub use config::EngineConfig;
pub use dispatcher::EventDispatcher;
pub use error::{EngineError, Result};
pub use evaluator::{Evaluation, RuleEvaluator};
pub use manager::{ConditionDescription, ConditionDraft, RuleDraft, RuleManager};
pub use registry::ConditionRegistry;
pub use sync::{MembershipSynchronizer, SyncOutcome};
