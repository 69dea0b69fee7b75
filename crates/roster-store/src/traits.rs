//! Core trait definitions for the storage layer
//!
//! All operations are async for non-blocking I/O and all
//! implementations must be `Send + Sync` for use across tasks. The
//! in-memory implementations in [`crate::memory`] back the test suites;
//! a database-backed implementation would satisfy the same contracts.

use std::collections::HashSet;

use async_trait::async_trait;
use roster_core::{
    ConditionId, ConditionRecord, CustomFieldDef, Group, GroupId, MatchRecord, Rule, RuleId,
    Subject, SubjectId, SubjectQuery,
};

use crate::Result;

/// A page request for display projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based offset into the result set.
    pub offset: usize,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl PageRequest {
    /// First page with the given size.
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

/// One page of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: usize,
    /// Offset this page starts at.
    pub offset: usize,
}

/// Persisted rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Load a rule by id.
    async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>>;

    /// List all rules.
    async fn list_rules(&self) -> Result<Vec<Rule>>;

    /// List enabled rules only.
    async fn list_enabled_rules(&self) -> Result<Vec<Rule>>;

    /// Create or update a rule. Assigns the id on first save and
    /// maintains the `updated_at` timestamp. Returns the stored copy.
    async fn save_rule(&self, rule: &Rule) -> Result<Rule>;

    /// Delete a rule record. Does not cascade; the manager deletes
    /// conditions and match history explicitly so it can notify about
    /// each.
    async fn delete_rule(&self, id: RuleId) -> Result<()>;

    /// Enabled rules containing at least one condition of the given
    /// kind. Implementations may join against condition data.
    async fn rules_with_condition_kind(&self, kind: &str) -> Result<Vec<Rule>>;
}

/// Persisted condition records, keyed by owning rule and position.
#[async_trait]
pub trait ConditionStore: Send + Sync {
    /// Conditions of a rule, in position order.
    async fn list_conditions(&self, rule_id: RuleId) -> Result<Vec<ConditionRecord>>;

    /// Create or update a condition record. Assigns the id on first
    /// save. Returns the stored copy.
    async fn save_condition(&self, record: &ConditionRecord) -> Result<ConditionRecord>;

    /// Delete one condition record.
    async fn delete_condition(&self, id: ConditionId) -> Result<()>;
}

/// The subject population.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Look up a subject by id.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>>;

    /// Create or update a subject.
    async fn save_subject(&self, subject: &Subject) -> Result<()>;

    /// The catalog of declared custom profile fields.
    async fn custom_fields(&self) -> Result<Vec<CustomFieldDef>>;

    /// Declare a custom profile field.
    async fn define_custom_field(&self, def: CustomFieldDef) -> Result<()>;

    /// Remove a custom profile field from the catalog. Conditions
    /// referencing it become broken.
    async fn remove_custom_field(&self, shortname: &str) -> Result<()>;

    /// Execute a composed query and return the matching subject ids.
    async fn search(&self, query: &SubjectQuery) -> Result<HashSet<SubjectId>>;

    /// Fetch full subjects for the given ids, in input order. Unknown
    /// ids are skipped.
    async fn fetch(&self, ids: &[SubjectId]) -> Result<Vec<Subject>>;
}

/// Target groups and their membership rosters.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Look up a group by id.
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>>;

    /// List all groups.
    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Create or update a group.
    async fn save_group(&self, group: &Group) -> Result<()>;

    /// Delete a group and its memberships. Rules still referencing the
    /// group become broken at their next evaluation.
    async fn delete_group(&self, id: GroupId) -> Result<()>;

    /// Update the ownership marker.
    async fn set_managed_by(&self, id: GroupId, marker: Option<String>) -> Result<()>;

    /// Current members, optionally narrowed to a single subject.
    async fn members(&self, id: GroupId, subject: Option<SubjectId>) -> Result<HashSet<SubjectId>>;

    /// Add a subject to a group. Adding an existing member is a no-op.
    async fn add_member(&self, id: GroupId, subject: SubjectId) -> Result<()>;

    /// Remove a subject from a group. Removing a non-member is a no-op.
    async fn remove_member(&self, id: GroupId, subject: SubjectId) -> Result<()>;
}

/// Per-subject match history.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Load the match record for a (rule, subject) pair.
    async fn get_match(&self, rule_id: RuleId, subject_id: SubjectId)
        -> Result<Option<MatchRecord>>;

    /// Insert or replace a match record.
    async fn upsert_match(&self, record: &MatchRecord) -> Result<()>;

    /// All match records of a rule.
    async fn list_matches(&self, rule_id: RuleId) -> Result<Vec<MatchRecord>>;

    /// Delete all match records of a rule. Only used by the rule
    /// deletion cascade.
    async fn delete_matches_of(&self, rule_id: RuleId) -> Result<()>;
}
