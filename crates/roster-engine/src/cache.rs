//! Result cache
//!
//! Memoizes the two lookups the hot paths repeat: "which enabled rules
//! reference condition kind X" and "which conditions belong to rule Y".
//! Entries carry no TTL; every rule or condition write invalidates the
//! whole cache.
//!
//! Fills are generation-guarded: a fill that started before an
//! invalidation is discarded instead of stored, so a write racing a
//! cache fill can never strand stale data (invalidate-then-recompute,
//! never the other way around).

use std::collections::HashMap;
use std::sync::Arc;

use roster_core::{ConditionRecord, Rule, RuleId};
use roster_store::{ConditionStore, RuleStore};
use tokio::sync::RwLock;
use tracing::debug;

use crate::Result;

#[derive(Default)]
struct CacheState {
    generation: u64,
    by_kind: HashMap<String, Vec<Rule>>,
    by_rule: HashMap<RuleId, Vec<ConditionRecord>>,
}

/// Write-invalidated cache over rule/condition lookups.
pub struct ResultCache {
    rules: Arc<dyn RuleStore>,
    conditions: Arc<dyn ConditionStore>,
    state: RwLock<CacheState>,
}

impl ResultCache {
    /// Create a cache over the given stores.
    pub fn new(rules: Arc<dyn RuleStore>, conditions: Arc<dyn ConditionStore>) -> Self {
        Self {
            rules,
            conditions,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Enabled rules containing at least one condition of the given
    /// kind.
    pub async fn rules_referencing_kind(&self, kind: &str) -> Result<Vec<Rule>> {
        let generation = {
            let state = self.state.read().await;
            if let Some(rules) = state.by_kind.get(kind) {
                return Ok(rules.clone());
            }
            state.generation
        };

        let computed = self.rules.rules_with_condition_kind(kind).await?;

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.by_kind.insert(kind.to_string(), computed.clone());
        }
        Ok(computed)
    }

    /// Conditions of a rule, in position order.
    pub async fn conditions_of(&self, rule_id: RuleId) -> Result<Vec<ConditionRecord>> {
        let generation = {
            let state = self.state.read().await;
            if let Some(records) = state.by_rule.get(&rule_id) {
                return Ok(records.clone());
            }
            state.generation
        };

        let computed = self.conditions.list_conditions(rule_id).await?;

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.by_rule.insert(rule_id, computed.clone());
        }
        Ok(computed)
    }

    /// Drop both projections. Called at every rule or condition write,
    /// before the writer publishes its result.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.by_kind.clear();
        state.by_rule.clear();
        debug!(generation = state.generation, "result cache invalidated");
    }
}
