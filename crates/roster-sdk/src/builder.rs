//! Builder pattern for RosterSync
//!
//! Defaults to a shared in-memory store behind every contract; any
//! store, the registry, the audit sink and the engine configuration
//! can be swapped for real implementations.
//!
//! # Example
//!
//! ```
//! use roster_sdk::RosterSyncBuilder;
//!
//! let service = RosterSyncBuilder::new().build();
//! ```

use std::sync::Arc;

use roster_engine::{
    ConditionRegistry, EngineConfig, EventDispatcher, MembershipSynchronizer, ResultCache,
    RuleEvaluator, RuleManager,
};
use roster_store::{
    AuditSink, ConditionStore, GroupStore, MatchStore, MemoryAuditLog, MemoryStore, RuleStore,
    SubjectStore,
};

use crate::RosterSync;

/// Builder for [`RosterSync`].
#[derive(Default)]
pub struct RosterSyncBuilder {
    rules: Option<Arc<dyn RuleStore>>,
    conditions: Option<Arc<dyn ConditionStore>>,
    subjects: Option<Arc<dyn SubjectStore>>,
    groups: Option<Arc<dyn GroupStore>>,
    matches: Option<Arc<dyn MatchStore>>,
    audit: Option<Arc<dyn AuditSink>>,
    registry: Option<ConditionRegistry>,
    config: EngineConfig,
}

impl RosterSyncBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one shared memory store for every storage contract. Handy
    /// for tests that want to inspect state behind the façade.
    pub fn with_memory_store(mut self, store: MemoryStore) -> Self {
        self.rules = Some(Arc::new(store.clone()));
        self.conditions = Some(Arc::new(store.clone()));
        self.subjects = Some(Arc::new(store.clone()));
        self.groups = Some(Arc::new(store.clone()));
        self.matches = Some(Arc::new(store));
        self
    }

    /// Set the rule store.
    pub fn with_rule_store(mut self, store: Arc<dyn RuleStore>) -> Self {
        self.rules = Some(store);
        self
    }

    /// Set the condition store.
    pub fn with_condition_store(mut self, store: Arc<dyn ConditionStore>) -> Self {
        self.conditions = Some(store);
        self
    }

    /// Set the subject-population store.
    pub fn with_subject_store(mut self, store: Arc<dyn SubjectStore>) -> Self {
        self.subjects = Some(store);
        self
    }

    /// Set the target-group store.
    pub fn with_group_store(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.groups = Some(store);
        self
    }

    /// Set the match-history store.
    pub fn with_match_store(mut self, store: Arc<dyn MatchStore>) -> Self {
        self.matches = Some(store);
        self
    }

    /// Set the audit sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Use a custom condition registry (e.g. with extra kinds
    /// registered on top of the built-in set).
    pub fn with_registry(mut self, registry: ConditionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire everything together.
    pub fn build(self) -> RosterSync {
        let fallback = MemoryStore::new();

        let rules = self
            .rules
            .unwrap_or_else(|| Arc::new(fallback.clone()) as Arc<dyn RuleStore>);
        let conditions = self
            .conditions
            .unwrap_or_else(|| Arc::new(fallback.clone()) as Arc<dyn ConditionStore>);
        let subjects = self
            .subjects
            .unwrap_or_else(|| Arc::new(fallback.clone()) as Arc<dyn SubjectStore>);
        let groups = self
            .groups
            .unwrap_or_else(|| Arc::new(fallback.clone()) as Arc<dyn GroupStore>);
        let matches = self
            .matches
            .unwrap_or_else(|| Arc::new(fallback) as Arc<dyn MatchStore>);
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(MemoryAuditLog::new()));
        let registry = Arc::new(self.registry.unwrap_or_default());

        let cache = Arc::new(ResultCache::new(rules.clone(), conditions.clone()));

        let evaluator = Arc::new(RuleEvaluator::new(
            rules.clone(),
            subjects.clone(),
            groups.clone(),
            registry.clone(),
            cache.clone(),
            audit.clone(),
        ));

        let synchronizer = Arc::new(MembershipSynchronizer::new(
            evaluator.clone(),
            groups.clone(),
            matches.clone(),
            self.config,
        ));

        let dispatcher = EventDispatcher::new(registry.clone(), cache.clone(), synchronizer.clone());

        let manager = RuleManager::new(
            rules.clone(),
            conditions,
            subjects.clone(),
            groups,
            matches,
            registry,
            cache,
            audit,
        );

        RosterSync {
            rules,
            subjects,
            manager,
            evaluator,
            synchronizer,
            dispatcher,
        }
    }
}
