//! Rule evaluator
//!
//! Computes the matching subject set for one rule and owns the
//! broken-state machine. Everything that can go wrong during an
//! evaluation is converted into state (the broken flag) plus an audit
//! notice; only storage failures while persisting that state surface to
//! the caller.

use std::collections::HashSet;
use std::sync::Arc;

use roster_core::{Rule, SubjectId};
use roster_store::{AuditEvent, AuditSink, GroupStore, RuleStore, SubjectStore};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::composer::QueryComposer;
use crate::conditions::{Condition, ConditionContext};
use crate::registry::ConditionRegistry;
use crate::Result;

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The rule was not evaluated: disabled, already broken, broken
    /// during this evaluation, or carrying no conditions. Callers must
    /// not touch group membership in this case.
    Skipped,
    /// The composed query ran; these are the matching subject ids.
    Matched(HashSet<SubjectId>),
}

impl Evaluation {
    /// The matching set, empty when the rule was skipped.
    pub fn into_set(self) -> HashSet<SubjectId> {
        match self {
            Evaluation::Skipped => HashSet::new(),
            Evaluation::Matched(set) => set,
        }
    }
}

/// Evaluates rules against the subject population.
pub struct RuleEvaluator {
    rules: Arc<dyn RuleStore>,
    subjects: Arc<dyn SubjectStore>,
    groups: Arc<dyn GroupStore>,
    registry: Arc<ConditionRegistry>,
    cache: Arc<ResultCache>,
    audit: Arc<dyn AuditSink>,
}

impl RuleEvaluator {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        subjects: Arc<dyn SubjectStore>,
        groups: Arc<dyn GroupStore>,
        registry: Arc<ConditionRegistry>,
        cache: Arc<ResultCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            rules,
            subjects,
            groups,
            registry,
            cache,
            audit,
        }
    }

    /// Evaluate a rule, optionally scoped to a single subject.
    ///
    /// The health re-check runs on every evaluation, not only on save:
    /// external state a condition references can vanish independently
    /// of the rule.
    pub async fn evaluate(&self, rule: &Rule, subject: Option<SubjectId>) -> Result<Evaluation> {
        if !rule.is_enabled() || rule.broken {
            return Ok(Evaluation::Skipped);
        }

        let records = self.cache.conditions_of(rule.id).await?;
        let conditions: Vec<Box<dyn Condition>> = records
            .iter()
            .map(|record| self.registry.resolve(record))
            .collect();

        let ctx = ConditionContext {
            rule: Some(rule),
            groups: self.groups.as_ref(),
            subjects: self.subjects.as_ref(),
        };
        for condition in &conditions {
            if condition.is_broken(&ctx).await {
                debug!(rule_id = %rule.id, kind = condition.kind(), "condition broken");
                self.transition_to_broken(rule).await?;
                return Ok(Evaluation::Skipped);
            }
        }

        // The target group can be deleted behind the rule's back.
        if self.groups.get_group(rule.group_id).await?.is_none() {
            self.transition_to_broken(rule).await?;
            return Ok(Evaluation::Skipped);
        }

        // No conditions: not actionable yet, but healthy.
        if conditions.is_empty() {
            return Ok(Evaluation::Skipped);
        }

        let query = QueryComposer::compose(&conditions, subject);
        match self.subjects.search(&query).await {
            Ok(matching) => {
                debug!(rule_id = %rule.id, count = matching.len(), "rule evaluated");
                Ok(Evaluation::Matched(matching))
            }
            Err(error) => {
                self.report_failure(rule, &error.to_string()).await?;
                self.transition_to_broken(rule).await?;
                Ok(Evaluation::Skipped)
            }
        }
    }

    /// The matching subject set for a rule; empty when the rule cannot
    /// be evaluated.
    pub async fn compute_matching_set(
        &self,
        rule: &Rule,
        subject: Option<SubjectId>,
    ) -> Result<HashSet<SubjectId>> {
        Ok(self.evaluate(rule, subject).await?.into_set())
    }

    /// Read-only variant for display projections: computes the set a
    /// healthy rule would match without transitioning any state. The
    /// rule's enabled flag is ignored so operators can preview disabled
    /// rules.
    pub async fn preview_matching_set(&self, rule: &Rule) -> Result<HashSet<SubjectId>> {
        let records = self.cache.conditions_of(rule.id).await?;
        if records.is_empty() {
            return Ok(HashSet::new());
        }

        let conditions: Vec<Box<dyn Condition>> = records
            .iter()
            .map(|record| self.registry.resolve(record))
            .collect();

        let ctx = ConditionContext {
            rule: Some(rule),
            groups: self.groups.as_ref(),
            subjects: self.subjects.as_ref(),
        };
        for condition in &conditions {
            if condition.is_broken(&ctx).await {
                return Ok(HashSet::new());
            }
        }

        let query = QueryComposer::compose(&conditions, None);
        match self.subjects.search(&query).await {
            Ok(matching) => Ok(matching),
            Err(error) => {
                warn!(rule_id = %rule.id, %error, "preview query failed");
                Ok(HashSet::new())
            }
        }
    }

    async fn transition_to_broken(&self, rule: &Rule) -> Result<()> {
        warn!(rule_id = %rule.id, "rule marked broken");
        let mut updated = rule.clone();
        updated.mark_broken();
        self.rules.save_rule(&updated).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    async fn report_failure(&self, rule: &Rule, error: &str) -> Result<()> {
        self.audit
            .record(AuditEvent::MatchingFailed {
                rule_id: rule.id,
                error: error.to_string(),
            })
            .await?;
        Ok(())
    }
}
