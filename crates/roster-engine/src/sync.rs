//! Membership synchronizer
//!
//! Diffs a rule's computed matching set against its target group's
//! current members and applies the minimal add/remove operations,
//! optionally recording per-subject match history.
//!
//! The evaluate → diff → apply sequence is a critical section keyed by
//! rule id: two concurrent synchronizations of the same rule racing on
//! group membership could apply conflicting operations or double-flip
//! the broken flag. Rules do not block each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use roster_core::{MatchRecord, Rule, RuleId, SubjectId};
use roster_store::{GroupStore, MatchStore};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::config::EngineConfig;
use crate::evaluator::{Evaluation, RuleEvaluator};
use crate::Result;

/// Per-rule mutual exclusion.
#[derive(Clone, Default)]
pub(crate) struct RuleLocks {
    inner: Arc<Mutex<HashMap<RuleId, Arc<Mutex<()>>>>>,
}

impl RuleLocks {
    pub(crate) async fn acquire(&self, id: RuleId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// What one synchronization did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    /// Whether the rule was actually evaluated (false when skipped as
    /// disabled, broken or conditionless).
    pub evaluated: bool,
    /// Subjects added to the target group.
    pub added: usize,
    /// Subjects removed from the target group.
    pub removed: usize,
}

/// Keeps target groups synchronized with computed matching sets.
pub struct MembershipSynchronizer {
    evaluator: Arc<RuleEvaluator>,
    groups: Arc<dyn GroupStore>,
    matches: Arc<dyn MatchStore>,
    config: EngineConfig,
    locks: RuleLocks,
}

impl MembershipSynchronizer {
    pub fn new(
        evaluator: Arc<RuleEvaluator>,
        groups: Arc<dyn GroupStore>,
        matches: Arc<dyn MatchStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            evaluator,
            groups,
            matches,
            config,
            locks: RuleLocks::default(),
        }
    }

    /// Evaluate the rule and apply the membership diff, optionally
    /// scoped to one subject.
    ///
    /// Idempotent: a second call with no intervening state change finds
    /// an empty diff. All reads happen before any write, so a failure
    /// mid-way leaves at worst a prefix of the diff applied and the
    /// next run completes the remainder.
    pub async fn sync(&self, rule: &Rule, subject: Option<SubjectId>) -> Result<SyncOutcome> {
        let _guard = self.locks.acquire(rule.id).await;

        let matching = match self.evaluator.evaluate(rule, subject).await? {
            Evaluation::Skipped => return Ok(SyncOutcome::default()),
            Evaluation::Matched(matching) => matching,
        };

        let current = self.groups.members(rule.group_id, subject).await?;

        let to_add: Vec<SubjectId> = matching.difference(&current).copied().collect();
        let to_remove: Vec<SubjectId> = current.difference(&matching).copied().collect();

        for subject_id in &to_add {
            self.groups.add_member(rule.group_id, *subject_id).await?;
            if self.config.record_match_history {
                self.record_matched(rule.id, *subject_id).await?;
            }
        }

        for subject_id in &to_remove {
            self.groups.remove_member(rule.group_id, *subject_id).await?;
            if self.config.record_match_history {
                self.record_unmatched(rule.id, *subject_id).await?;
            }
        }

        if !to_add.is_empty() || !to_remove.is_empty() {
            info!(
                rule_id = %rule.id,
                added = to_add.len(),
                removed = to_remove.len(),
                "membership synchronized"
            );
        }

        Ok(SyncOutcome {
            evaluated: true,
            added: to_add.len(),
            removed: to_remove.len(),
        })
    }

    async fn record_matched(&self, rule_id: RuleId, subject_id: SubjectId) -> Result<()> {
        let now = Utc::now();
        let record = match self.matches.get_match(rule_id, subject_id).await? {
            Some(mut existing) => {
                existing.rematch(now);
                existing
            }
            None => MatchRecord::matched(rule_id, subject_id, now),
        };
        self.matches.upsert_match(&record).await?;
        Ok(())
    }

    async fn record_unmatched(&self, rule_id: RuleId, subject_id: SubjectId) -> Result<()> {
        let now = Utc::now();
        let record = match self.matches.get_match(rule_id, subject_id).await? {
            Some(mut existing) => {
                existing.unmatch(now);
                existing
            }
            None => {
                // The subject was a member before the rule tracked it;
                // open and close the record in one step.
                let mut record = MatchRecord::matched(rule_id, subject_id, now);
                record.unmatch(now);
                record
            }
        };
        self.matches.upsert_match(&record).await?;
        Ok(())
    }
}
