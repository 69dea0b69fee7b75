//! Pluggable condition behaviors
//!
//! A persisted [`ConditionRecord`] is just a kind tag plus an opaque
//! configuration blob. The registry resolves the tag to one of the
//! behaviors in this module and attaches the record's configuration to
//! it; everything the engine knows about a condition goes through the
//! [`Condition`] trait.

pub mod group_membership;
pub mod profile_field;
pub mod unresolved;

pub use group_membership::GroupMembershipCondition;
pub use profile_field::{CustomProfileFieldCondition, ProfileFieldCondition};
pub use unresolved::UnresolvedCondition;

use async_trait::async_trait;
use roster_core::{AliasAllocator, EventKind, FieldError, QueryFragment, Rule};
use roster_store::{GroupStore, SubjectStore};

/// External state a condition may consult when judging its own health
/// or describing itself.
pub struct ConditionContext<'a> {
    /// The owning rule, when known. Conditions that can reference the
    /// rule's own target group need it to detect self-reference.
    pub rule: Option<&'a Rule>,
    /// Target groups.
    pub groups: &'a dyn GroupStore,
    /// The subject population (for the custom field catalog).
    pub subjects: &'a dyn SubjectStore,
}

/// One predicate contribution to a rule.
///
/// Implementations hold their configuration; behavior objects are
/// created per record by the registry and are cheap to construct.
#[async_trait]
pub trait Condition: Send + Sync {
    /// The kind tag this behavior was resolved from.
    fn kind(&self) -> &str;

    /// Human-readable condition name. Defines registry ordering.
    fn name(&self) -> String;

    /// Validate the attached configuration. Pure, no I/O; errors are
    /// reported per configuration field and never thrown.
    fn validate(&self) -> Vec<FieldError>;

    /// The domain events that can change this condition's matching
    /// result.
    fn subscribed_events(&self) -> &'static [EventKind];

    /// Whether the configuration references a vanished external value
    /// or is semantically inconsistent. A broken condition's query
    /// contribution must never be trusted.
    ///
    /// Store failures during the check count as broken: when external
    /// state cannot be confirmed, the conservative answer is yes.
    async fn is_broken(&self, ctx: &ConditionContext<'_>) -> bool;

    /// Human-readable rendering of the stored configuration. Derivable
    /// without executing a query.
    async fn describe(&self, ctx: &ConditionContext<'_>) -> String;

    /// Compile the configuration into a query fragment, drawing aliases
    /// from the composition-scoped allocator. Callers check
    /// [`Condition::is_broken`] first; a behavior that still finds its
    /// configuration unusable returns an exclude-everything fragment
    /// rather than guessing.
    fn to_query_fragment(&self, aliases: &mut AliasAllocator) -> QueryFragment;
}
