//! Shared fixtures for the integration tests

use std::sync::Arc;

use roster_sdk::{
    ConditionDraft, ConfigMap, Group, GroupId, GroupStore, MemoryAuditLog, MemoryStore,
    RosterSync, RosterSyncBuilder, Subject, SubjectId, SubjectStore, Value,
};

/// A service over a shared memory store, with direct store and audit
/// access for assertions.
pub struct TestEnv {
    pub store: MemoryStore,
    pub audit: Arc<MemoryAuditLog>,
    pub service: RosterSync,
}

impl TestEnv {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let audit = Arc::new(MemoryAuditLog::new());
        let service = RosterSyncBuilder::new()
            .with_memory_store(store.clone())
            .with_audit_sink(audit.clone())
            .build();
        Self {
            store,
            audit,
            service,
        }
    }

    pub async fn add_group(&self, id: i64, name: &str) -> GroupId {
        self.store
            .save_group(&Group::new(GroupId(id), name))
            .await
            .unwrap();
        GroupId(id)
    }

    pub async fn add_subject(&self, id: i64, username: &str) -> SubjectId {
        self.store
            .save_subject(&Subject::new(SubjectId(id), username))
            .await
            .unwrap();
        SubjectId(id)
    }
}

/// A `profile_field` condition draft comparing one standard field.
pub fn profile_condition(field: &str, operator: &str, value: &str) -> ConditionDraft {
    let mut config = ConfigMap::new();
    config.insert("field".to_string(), Value::from(field));
    config.insert("operator".to_string(), Value::from(operator));
    config.insert("value".to_string(), Value::from(value));
    ConditionDraft::new("profile_field", config)
}

/// A `group_membership` condition draft over the given groups.
pub fn membership_condition(operator: &str, groups: &[i64]) -> ConditionDraft {
    let mut config = ConfigMap::new();
    config.insert("operator".to_string(), Value::from(operator));
    config.insert(
        "groups".to_string(),
        Value::List(groups.iter().map(|id| Value::Int(*id)).collect()),
    );
    ConditionDraft::new("group_membership", config)
}
