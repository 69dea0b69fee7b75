//! Rule manager
//!
//! The administrative save and delete path: target-group reservation,
//! diff-based condition upserts with dense position renumbering, the
//! post-save health check, and the deletion cascade. Integrity
//! violations (unknown group, group reserved for another rule) are
//! returned as errors and block the write; nothing here degrades
//! silently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use roster_core::{
    group::MANAGED_BY, ConditionId, ConditionRecord, ConfigMap, FieldError, GroupId, Rule, RuleId,
};
use roster_store::{
    AuditEvent, AuditSink, ConditionStore, GroupStore, MatchStore, RuleStore, SubjectStore,
};
use tracing::info;

use crate::cache::ResultCache;
use crate::conditions::ConditionContext;
use crate::registry::ConditionRegistry;
use crate::{EngineError, Result};

/// Submitted state of one condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDraft {
    /// Existing record id for updates, `None` for new conditions.
    pub id: Option<ConditionId>,
    /// Kind tag.
    pub kind: String,
    /// Kind-specific configuration.
    pub config: ConfigMap,
}

impl ConditionDraft {
    pub fn new(kind: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            config,
        }
    }
}

/// Submitted state of a rule, including its full condition list. The
/// list replaces whatever was stored before: conditions absent from it
/// are deleted, and positions are renumbered densely in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    /// Existing rule id for updates, `None` to create.
    pub id: Option<RuleId>,
    pub name: String,
    pub group_id: GroupId,
    pub description: Option<String>,
    pub conditions: Vec<ConditionDraft>,
}

impl RuleDraft {
    /// Draft for a new rule.
    pub fn create(name: impl Into<String>, group_id: GroupId) -> Self {
        Self {
            id: None,
            name: name.into(),
            group_id,
            description: None,
            conditions: Vec::new(),
        }
    }

    /// Draft updating an existing rule.
    pub fn update(rule: &Rule) -> Self {
        Self {
            id: Some(rule.id),
            name: rule.name.clone(),
            group_id: rule.group_id,
            description: rule.description.clone(),
            conditions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_condition(mut self, condition: ConditionDraft) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Display projection of a condition record.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDescription {
    pub name: String,
    pub description: String,
}

/// Administrative write path for rules and their conditions.
pub struct RuleManager {
    rules: Arc<dyn RuleStore>,
    conditions: Arc<dyn ConditionStore>,
    subjects: Arc<dyn SubjectStore>,
    groups: Arc<dyn GroupStore>,
    matches: Arc<dyn MatchStore>,
    registry: Arc<ConditionRegistry>,
    cache: Arc<ResultCache>,
    audit: Arc<dyn AuditSink>,
}

impl RuleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<dyn RuleStore>,
        conditions: Arc<dyn ConditionStore>,
        subjects: Arc<dyn SubjectStore>,
        groups: Arc<dyn GroupStore>,
        matches: Arc<dyn MatchStore>,
        registry: Arc<ConditionRegistry>,
        cache: Arc<ResultCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            rules,
            conditions,
            subjects,
            groups,
            matches,
            registry,
            cache,
            audit,
        }
    }

    /// Validate a condition draft's configuration. Field-level errors
    /// for the configuration-editing boundary; never stops a save.
    pub fn validate_condition(&self, draft: &ConditionDraft) -> Vec<FieldError> {
        self.registry
            .instantiate(&draft.kind, draft.config.clone())
            .validate()
    }

    /// Create or update a rule together with its condition list.
    ///
    /// Every save parks the rule disabled; enabling is an explicit
    /// operator action afterwards. Integrity checks run before any
    /// write, so a rejected save leaves all group references unchanged.
    pub async fn save_rule(&self, draft: &RuleDraft) -> Result<Rule> {
        self.check_reservation(draft).await?;

        let (mut rule, old_group_id, is_new) = match draft.id {
            None => (Rule::new(draft.name.clone(), draft.group_id), None, true),
            Some(id) => {
                let existing = self
                    .rules
                    .get_rule(id)
                    .await?
                    .ok_or(EngineError::RuleNotFound(id))?;
                let old_group_id = existing.group_id;
                let mut updated = existing;
                updated.name = draft.name.clone();
                updated.group_id = draft.group_id;
                (updated, Some(old_group_id), false)
            }
        };
        rule.description = draft.description.clone();
        rule.enabled = false;
        rule.broken = false;

        let rule = self.rules.save_rule(&rule).await?;
        self.audit
            .record(if is_new {
                AuditEvent::RuleCreated { rule_id: rule.id }
            } else {
                AuditEvent::RuleUpdated { rule_id: rule.id }
            })
            .await?;

        if let Some(old_group_id) = old_group_id {
            if old_group_id != draft.group_id {
                self.release_group(old_group_id, rule.id).await?;
            }
        }
        self.groups
            .set_managed_by(draft.group_id, Some(MANAGED_BY.to_string()))
            .await?;

        self.apply_conditions(&rule, &draft.conditions).await?;

        let rule = self.recheck_health(rule).await?;
        self.cache.invalidate().await;

        info!(rule_id = %rule.id, broken = rule.broken, "rule saved");
        Ok(rule)
    }

    /// Flip the enabled flag. Broken rules stay disabled; the request
    /// is ignored for them, mirroring the evaluation-side invariant.
    pub async fn set_enabled(&self, id: RuleId, enabled: bool) -> Result<Rule> {
        let mut rule = self
            .rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))?;

        if !rule.broken && rule.enabled != enabled {
            rule.enabled = enabled;
            rule = self.rules.save_rule(&rule).await?;
            self.audit
                .record(AuditEvent::RuleUpdated { rule_id: rule.id })
                .await?;
            self.cache.invalidate().await;
        }

        Ok(rule)
    }

    /// Delete a rule and cascade: condition records, match history, and
    /// the group reservation when no other rule still references the
    /// group.
    pub async fn delete_rule(&self, id: RuleId) -> Result<()> {
        let rule = self
            .rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))?;
        let records = self.conditions.list_conditions(id).await?;

        self.rules.delete_rule(id).await?;
        self.audit
            .record(AuditEvent::RuleDeleted { rule_id: id })
            .await?;

        for record in records {
            let described = self.describe_record(&record, Some(&rule)).await;
            self.conditions.delete_condition(record.id).await?;
            self.audit
                .record(AuditEvent::ConditionDeleted {
                    rule_id: id,
                    name: described.name,
                    description: described.description,
                })
                .await?;
        }

        self.matches.delete_matches_of(id).await?;
        self.release_group(rule.group_id, id).await?;
        self.cache.invalidate().await;

        info!(rule_id = %id, "rule deleted");
        Ok(())
    }

    /// Display projection of a condition record: resolved name plus a
    /// human-readable description. Broken or unresolvable conditions
    /// echo their raw configuration.
    pub async fn describe_condition(&self, record: &ConditionRecord) -> ConditionDescription {
        self.describe_record(record, None).await
    }

    /// Reservation exclusivity: the target group must exist, must not
    /// carry a foreign ownership marker, and must not be reserved for a
    /// different rule.
    async fn check_reservation(&self, draft: &RuleDraft) -> Result<()> {
        let group = self
            .groups
            .get_group(draft.group_id)
            .await?
            .ok_or(EngineError::GroupNotFound(draft.group_id))?;

        if !group.is_available() {
            return Err(EngineError::GroupUnavailable(group.id));
        }

        if group.is_managed() {
            for rule in self.rules.list_rules().await? {
                if rule.group_id == group.id && Some(rule.id) != draft.id {
                    return Err(EngineError::GroupAlreadyManaged {
                        group_id: group.id,
                        rule_id: rule.id,
                    });
                }
            }
        }

        Ok(())
    }

    /// Clear the reservation marker unless another rule still
    /// references the group.
    async fn release_group(&self, group_id: GroupId, departing_rule: RuleId) -> Result<()> {
        let still_referenced = self
            .rules
            .list_rules()
            .await?
            .iter()
            .any(|rule| rule.group_id == group_id && rule.id != departing_rule);
        if still_referenced {
            return Ok(());
        }

        if let Some(group) = self.groups.get_group(group_id).await? {
            if group.is_managed() {
                self.groups.set_managed_by(group_id, None).await?;
            }
        }
        Ok(())
    }

    /// Upsert the submitted condition list against the stored one.
    async fn apply_conditions(&self, rule: &Rule, drafts: &[ConditionDraft]) -> Result<()> {
        let existing = self.conditions.list_conditions(rule.id).await?;
        let existing_by_id: HashMap<ConditionId, ConditionRecord> = existing
            .iter()
            .map(|record| (record.id, record.clone()))
            .collect();
        let mut kept = HashSet::new();

        for (position, draft) in drafts.iter().enumerate() {
            let position = position as u32;

            match draft.id.and_then(|id| existing_by_id.get(&id)) {
                Some(old) => {
                    let previous = self.describe_record(old, Some(rule)).await.description;

                    let mut updated = old.clone();
                    updated.kind = draft.kind.clone();
                    updated.config = draft.config.clone();
                    updated.position = position;
                    let stored = self.conditions.save_condition(&updated).await?;
                    kept.insert(stored.id);

                    let described = self.describe_record(&stored, Some(rule)).await;
                    self.audit
                        .record(AuditEvent::ConditionUpdated {
                            rule_id: rule.id,
                            name: described.name,
                            description: described.description,
                            previous_description: previous,
                        })
                        .await?;
                }
                None => {
                    let mut record = ConditionRecord::new(draft.kind.clone(), draft.config.clone());
                    record.rule_id = rule.id;
                    record.position = position;
                    let stored = self.conditions.save_condition(&record).await?;

                    let described = self.describe_record(&stored, Some(rule)).await;
                    self.audit
                        .record(AuditEvent::ConditionCreated {
                            rule_id: rule.id,
                            name: described.name,
                            description: described.description,
                        })
                        .await?;
                }
            }
        }

        for record in existing {
            if !kept.contains(&record.id) {
                let described = self.describe_record(&record, Some(rule)).await;
                self.conditions.delete_condition(record.id).await?;
                self.audit
                    .record(AuditEvent::ConditionDeleted {
                        rule_id: rule.id,
                        name: described.name,
                        description: described.description,
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Re-run the broken check against the saved conditions and persist
    /// the resulting health state. Un-breaking never re-enables.
    async fn recheck_health(&self, mut rule: Rule) -> Result<Rule> {
        let records = self.conditions.list_conditions(rule.id).await?;
        let ctx = ConditionContext {
            rule: Some(&rule),
            groups: self.groups.as_ref(),
            subjects: self.subjects.as_ref(),
        };

        let mut broken = false;
        for record in &records {
            if self.registry.resolve(record).is_broken(&ctx).await {
                broken = true;
                break;
            }
        }

        if broken {
            rule.mark_broken();
        } else {
            rule.mark_unbroken();
        }
        Ok(self.rules.save_rule(&rule).await?)
    }

    async fn describe_record(
        &self,
        record: &ConditionRecord,
        rule: Option<&Rule>,
    ) -> ConditionDescription {
        let condition = self.registry.resolve(record);
        let ctx = ConditionContext {
            rule,
            groups: self.groups.as_ref(),
            subjects: self.subjects.as_ref(),
        };

        let description = if condition.is_broken(&ctx).await {
            record.raw_config()
        } else {
            condition.describe(&ctx).await
        };

        ConditionDescription {
            name: condition.name(),
            description,
        }
    }
}
