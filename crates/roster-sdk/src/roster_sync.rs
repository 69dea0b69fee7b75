//! The RosterSync façade
//!
//! One object wiring stores, registry, cache, evaluator, synchronizer,
//! dispatcher and manager together, exposing the operations
//! collaborators call: the administrative save path, full and
//! incremental re-evaluation, and read-only display projections.

use std::sync::Arc;

use roster_core::{ConditionRecord, DomainEvent, FieldError, Rule, RuleId, Subject};
use roster_engine::{
    ConditionDescription, ConditionDraft, EngineError, EventDispatcher, MembershipSynchronizer,
    RuleDraft, RuleEvaluator, RuleManager, SyncOutcome,
};
use roster_store::{Page, PageRequest, RuleStore, SubjectStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

/// Result of a full-population sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Enabled rules the sweep visited.
    pub rules_processed: usize,
    /// Rules whose synchronization returned an error. Failures never
    /// abort the sweep.
    pub rules_failed: usize,
}

/// High-level entry point to the rostersync engine.
///
/// Constructed by [`RosterSyncBuilder`](crate::RosterSyncBuilder).
pub struct RosterSync {
    pub(crate) rules: Arc<dyn RuleStore>,
    pub(crate) subjects: Arc<dyn SubjectStore>,
    pub(crate) manager: RuleManager,
    pub(crate) evaluator: Arc<RuleEvaluator>,
    pub(crate) synchronizer: Arc<MembershipSynchronizer>,
    pub(crate) dispatcher: EventDispatcher,
}

impl RosterSync {
    // ----- administrative save path -----

    /// Create or update a rule with its condition list. Integrity
    /// violations (unknown target group, group reserved for another
    /// rule) fail the call and leave stored state unchanged.
    pub async fn save_rule(&self, draft: &RuleDraft) -> Result<Rule> {
        Ok(self.manager.save_rule(draft).await?)
    }

    /// Delete a rule, cascading to conditions, match history and the
    /// group reservation.
    pub async fn delete_rule(&self, id: RuleId) -> Result<()> {
        Ok(self.manager.delete_rule(id).await?)
    }

    /// Enable or disable a rule. Broken rules stay disabled.
    pub async fn set_rule_enabled(&self, id: RuleId, enabled: bool) -> Result<Rule> {
        Ok(self.manager.set_enabled(id, enabled).await?)
    }

    /// Field-level validation of a condition draft, for the
    /// configuration-editing boundary.
    pub fn validate_condition(&self, draft: &ConditionDraft) -> Vec<FieldError> {
        self.manager.validate_condition(draft)
    }

    // ----- evaluation and synchronization -----

    /// Fully re-evaluate one rule and synchronize its target group.
    pub async fn evaluate_and_sync(&self, id: RuleId) -> Result<SyncOutcome> {
        let rule = self
            .rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))?;
        Ok(self.synchronizer.sync(&rule, None).await?)
    }

    /// Sweep all enabled rules. One rule's failure never aborts the
    /// sweep; rules are processed sequentially and the whole sweep is
    /// idempotent, so a crashed run is simply restarted.
    pub async fn process_all_rules(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for rule in self.rules.list_enabled_rules().await? {
            report.rules_processed += 1;
            if let Err(error) = self.synchronizer.sync(&rule, None).await {
                report.rules_failed += 1;
                warn!(rule_id = %rule.id, %error, "sweep: rule failed");
            }
        }

        Ok(report)
    }

    /// Entry point for domain events: re-evaluates affected rules
    /// scoped to the event's subject.
    pub async fn handle_event(&self, event: &DomainEvent) -> Result<()> {
        Ok(self.dispatcher.handle_event(event).await?)
    }

    // ----- read-only projections -----

    /// Number of subjects a rule currently matches. Mutates nothing.
    pub async fn count_matching_subjects(&self, id: RuleId) -> Result<usize> {
        let rule = self
            .rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))?;
        Ok(self.evaluator.preview_matching_set(&rule).await?.len())
    }

    /// One page of the subjects a rule currently matches, ordered by
    /// subject id. Mutates nothing.
    pub async fn list_matching_subjects(
        &self,
        id: RuleId,
        page: PageRequest,
    ) -> Result<Page<Subject>> {
        let rule = self
            .rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))?;

        let mut ids: Vec<_> = self
            .evaluator
            .preview_matching_set(&rule)
            .await?
            .into_iter()
            .collect();
        ids.sort();

        let total = ids.len();
        let window: Vec<_> = ids.into_iter().skip(page.offset).take(page.limit).collect();
        let items = self.subjects.fetch(&window).await?;

        Ok(Page {
            items,
            total,
            offset: page.offset,
        })
    }

    /// Display projection of a condition record. Broken or
    /// unresolvable conditions echo their raw configuration.
    pub async fn describe_condition(&self, record: &ConditionRecord) -> ConditionDescription {
        self.manager.describe_condition(record).await
    }

    /// Load a rule.
    pub async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>> {
        Ok(self.rules.get_rule(id).await?)
    }

    /// All rules, ordered by id.
    pub async fn list_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.list_rules().await?)
    }
}
