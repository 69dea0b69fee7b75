//! In-memory store
//!
//! A single shared-state implementation of every storage trait.
//! Suitable for tests and development; data is lost when the process
//! exits. Cloning is cheap and all clones share the same state, so one
//! instance can serve as rule, condition, subject, group and match
//! store at once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use roster_core::{
    ConditionId, ConditionRecord, CustomFieldDef, Group, GroupId, MatchRecord, Rule, RuleId,
    Subject, SubjectId, SubjectQuery,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::query_exec::subject_matches;
use crate::traits::{ConditionStore, GroupStore, MatchStore, RuleStore, SubjectStore};
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    rules: HashMap<RuleId, Rule>,
    conditions: HashMap<ConditionId, ConditionRecord>,
    subjects: HashMap<SubjectId, Subject>,
    custom_fields: Vec<CustomFieldDef>,
    groups: HashMap<GroupId, Group>,
    memberships: HashMap<GroupId, HashSet<SubjectId>>,
    matches: HashMap<(RuleId, SubjectId), MatchRecord>,
    next_rule_id: i64,
    next_condition_id: i64,
}

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>> {
        Ok(self.state.read().await.rules.get(&id).cloned())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>> {
        let state = self.state.read().await;
        let mut rules: Vec<Rule> = state.rules.values().cloned().collect();
        rules.sort_by_key(|rule| rule.id);
        Ok(rules)
    }

    async fn list_enabled_rules(&self) -> Result<Vec<Rule>> {
        Ok(self
            .list_rules()
            .await?
            .into_iter()
            .filter(Rule::is_enabled)
            .collect())
    }

    async fn save_rule(&self, rule: &Rule) -> Result<Rule> {
        let mut state = self.state.write().await;
        let mut stored = rule.clone();

        let now = Utc::now();
        if stored.id.is_unsaved() {
            state.next_rule_id += 1;
            stored.id = RuleId(state.next_rule_id);
            stored.created_at = now;
        }
        stored.updated_at = now;

        state.rules.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_rule(&self, id: RuleId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .rules
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RuleNotFound(id))
    }

    async fn rules_with_condition_kind(&self, kind: &str) -> Result<Vec<Rule>> {
        let state = self.state.read().await;

        let rule_ids: HashSet<RuleId> = state
            .conditions
            .values()
            .filter(|record| record.kind == kind)
            .map(|record| record.rule_id)
            .collect();

        let mut rules: Vec<Rule> = rule_ids
            .into_iter()
            .filter_map(|id| state.rules.get(&id))
            .filter(|rule| rule.is_enabled())
            .cloned()
            .collect();
        rules.sort_by_key(|rule| rule.id);
        Ok(rules)
    }
}

#[async_trait]
impl ConditionStore for MemoryStore {
    async fn list_conditions(&self, rule_id: RuleId) -> Result<Vec<ConditionRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<ConditionRecord> = state
            .conditions
            .values()
            .filter(|record| record.rule_id == rule_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.position);
        Ok(records)
    }

    async fn save_condition(&self, record: &ConditionRecord) -> Result<ConditionRecord> {
        let mut state = self.state.write().await;
        let mut stored = record.clone();

        if stored.id.is_unsaved() {
            state.next_condition_id += 1;
            stored.id = ConditionId(state.next_condition_id);
        }

        state.conditions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_condition(&self, id: ConditionId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .conditions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::ConditionNotFound(id))
    }
}

#[async_trait]
impl SubjectStore for MemoryStore {
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>> {
        Ok(self.state.read().await.subjects.get(&id).cloned())
    }

    async fn save_subject(&self, subject: &Subject) -> Result<()> {
        let mut state = self.state.write().await;
        state.subjects.insert(subject.id, subject.clone());
        Ok(())
    }

    async fn custom_fields(&self) -> Result<Vec<CustomFieldDef>> {
        Ok(self.state.read().await.custom_fields.clone())
    }

    async fn define_custom_field(&self, def: CustomFieldDef) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .custom_fields
            .retain(|existing| existing.shortname != def.shortname);
        state.custom_fields.push(def);
        Ok(())
    }

    async fn remove_custom_field(&self, shortname: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .custom_fields
            .retain(|existing| existing.shortname != shortname);
        Ok(())
    }

    async fn search(&self, query: &SubjectQuery) -> Result<HashSet<SubjectId>> {
        let state = self.state.read().await;
        let mut matching = HashSet::new();

        match query.subject {
            Some(id) => {
                if let Some(subject) = state.subjects.get(&id) {
                    if subject_matches(subject, query, &state.memberships)? {
                        matching.insert(subject.id);
                    }
                }
            }
            None => {
                for subject in state.subjects.values() {
                    if subject_matches(subject, query, &state.memberships)? {
                        matching.insert(subject.id);
                    }
                }
            }
        }

        debug!(count = matching.len(), "subject query executed");
        Ok(matching)
    }

    async fn fetch(&self, ids: &[SubjectId]) -> Result<Vec<Subject>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.subjects.get(id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by_key(|group| group.id);
        Ok(groups)
    }

    async fn save_group(&self, group: &Group) -> Result<()> {
        let mut state = self.state.write().await;
        state.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<()> {
        let mut state = self.state.write().await;
        state.memberships.remove(&id);
        state
            .groups
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::GroupNotFound(id))
    }

    async fn set_managed_by(&self, id: GroupId, marker: Option<String>) -> Result<()> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or(StoreError::GroupNotFound(id))?;
        group.managed_by = marker;
        Ok(())
    }

    async fn members(&self, id: GroupId, subject: Option<SubjectId>) -> Result<HashSet<SubjectId>> {
        let state = self.state.read().await;
        let members = state.memberships.get(&id).cloned().unwrap_or_default();

        Ok(match subject {
            Some(subject_id) => members
                .into_iter()
                .filter(|member| *member == subject_id)
                .collect(),
            None => members,
        })
    }

    async fn add_member(&self, id: GroupId, subject: SubjectId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&id) {
            return Err(StoreError::GroupNotFound(id));
        }
        state.memberships.entry(id).or_default().insert(subject);
        Ok(())
    }

    async fn remove_member(&self, id: GroupId, subject: SubjectId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(members) = state.memberships.get_mut(&id) {
            members.remove(&subject);
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_match(
        &self,
        rule_id: RuleId,
        subject_id: SubjectId,
    ) -> Result<Option<MatchRecord>> {
        Ok(self
            .state
            .read()
            .await
            .matches
            .get(&(rule_id, subject_id))
            .cloned())
    }

    async fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .matches
            .insert((record.rule_id, record.subject_id), record.clone());
        Ok(())
    }

    async fn list_matches(&self, rule_id: RuleId) -> Result<Vec<MatchRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<MatchRecord> = state
            .matches
            .values()
            .filter(|record| record.rule_id == rule_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.subject_id);
        Ok(records)
    }

    async fn delete_matches_of(&self, rule_id: RuleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.matches.retain(|(owner, _), _| *owner != rule_id);
        Ok(())
    }
}
