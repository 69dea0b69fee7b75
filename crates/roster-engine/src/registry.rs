//! Condition registry
//!
//! Maps kind tags to behavior factories. The registry is built once at
//! startup; custom kinds can be registered on top of the built-in set.
//! Resolution never fails: unknown tags yield the always-broken
//! [`UnresolvedCondition`].

use std::collections::HashMap;
use std::sync::Arc;

use roster_core::{ConditionRecord, ConfigMap, EventKind};

use crate::conditions::{
    group_membership::{self, GroupMembershipCondition},
    profile_field::{self, CustomProfileFieldCondition, ProfileFieldCondition},
    unresolved::UnresolvedCondition,
    Condition,
};

type Factory = Arc<dyn Fn(ConfigMap) -> Box<dyn Condition> + Send + Sync>;

/// Registry of available condition kinds.
pub struct ConditionRegistry {
    factories: HashMap<String, Factory>,
    subscriptions: HashMap<EventKind, Vec<String>>,
}

impl ConditionRegistry {
    /// An empty registry. Most callers want [`ConditionRegistry::with_builtin`].
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Registry with the built-in condition kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(profile_field::PROFILE_FIELD, |config| {
            Box::new(ProfileFieldCondition::new(config))
        });
        registry.register(profile_field::CUSTOM_PROFILE_FIELD, |config| {
            Box::new(CustomProfileFieldCondition::new(config))
        });
        registry.register(group_membership::GROUP_MEMBERSHIP, |config| {
            Box::new(GroupMembershipCondition::new(config))
        });
        registry
    }

    /// Register a condition kind. Re-registering a tag replaces the
    /// previous factory.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(ConfigMap) -> Box<dyn Condition> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_string(), Arc::new(factory));
        self.rebuild_subscriptions();
    }

    /// Whether a kind tag resolves to a registered behavior.
    pub fn is_known(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Create a behavior of the given kind with the given
    /// configuration. Unknown kinds yield the unresolved behavior.
    pub fn instantiate(&self, kind: &str, config: ConfigMap) -> Box<dyn Condition> {
        match self.factories.get(kind) {
            Some(factory) => factory(config),
            None => Box::new(UnresolvedCondition::new(kind, config)),
        }
    }

    /// Resolve a persisted record into its behavior with the record's
    /// configuration attached.
    pub fn resolve(&self, record: &ConditionRecord) -> Box<dyn Condition> {
        self.instantiate(&record.kind, record.config.clone())
    }

    /// Prototype instances (empty configuration) of every registered
    /// kind, sorted by display name.
    pub fn all(&self) -> Vec<Box<dyn Condition>> {
        let mut prototypes: Vec<Box<dyn Condition>> = self
            .factories
            .values()
            .map(|factory| factory(ConfigMap::new()))
            .collect();
        prototypes.sort_by_key(|condition| condition.name());
        prototypes
    }

    /// Kind tags whose behaviors subscribe to the given event kind.
    pub fn kinds_subscribed_to(&self, event: EventKind) -> Vec<String> {
        self.subscriptions.get(&event).cloned().unwrap_or_default()
    }

    /// Subscription map rebuilt from kind prototypes; done eagerly so
    /// event dispatch is a plain lookup.
    fn rebuild_subscriptions(&mut self) {
        let mut subscriptions: HashMap<EventKind, Vec<String>> = HashMap::new();

        for (kind, factory) in &self.factories {
            let prototype = factory(ConfigMap::new());
            for event in prototype.subscribed_events() {
                subscriptions.entry(*event).or_default().push(kind.clone());
            }
        }

        for kinds in subscriptions.values_mut() {
            kinds.sort();
        }

        self.subscriptions = subscriptions;
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_are_known() {
        let registry = ConditionRegistry::with_builtin();
        assert!(registry.is_known("profile_field"));
        assert!(registry.is_known("custom_profile_field"));
        assert!(registry.is_known("group_membership"));
        assert!(!registry.is_known("retired_kind"));
    }

    #[test]
    fn test_all_sorted_by_name() {
        let registry = ConditionRegistry::with_builtin();
        let names: Vec<String> = registry
            .all()
            .iter()
            .map(|condition| condition.name())
            .collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_resolve_unknown_kind_yields_unresolved() {
        let registry = ConditionRegistry::with_builtin();
        let record = ConditionRecord::new("retired_kind", ConfigMap::new());

        let condition = registry.resolve(&record);
        assert_eq!(condition.kind(), "retired_kind");
        assert!(condition.subscribed_events().is_empty());
    }

    #[test]
    fn test_subscriptions_cover_builtin_events() {
        let registry = ConditionRegistry::with_builtin();

        let profile_kinds = registry.kinds_subscribed_to(EventKind::SubjectUpdated);
        assert_eq!(
            profile_kinds,
            vec!["custom_profile_field".to_string(), "profile_field".to_string()]
        );

        let membership_kinds = registry.kinds_subscribed_to(EventKind::GroupMemberAdded);
        assert_eq!(membership_kinds, vec!["group_membership".to_string()]);
    }

    #[test]
    fn test_register_extends_subscriptions() {
        use crate::conditions::GroupMembershipCondition;

        let mut registry = ConditionRegistry::with_builtin();
        registry.register("vip_membership", |config| {
            Box::new(GroupMembershipCondition::new(config))
        });

        let kinds = registry.kinds_subscribed_to(EventKind::GroupMemberRemoved);
        assert_eq!(
            kinds,
            vec!["group_membership".to_string(), "vip_membership".to_string()]
        );
    }
}
