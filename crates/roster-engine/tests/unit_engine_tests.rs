//! Engine integration tests: registry, composer, evaluator and
//! synchronizer working together over the in-memory stores.

use std::collections::HashSet;
use std::sync::Arc;

use roster_core::{
    ConditionRecord, ConfigMap, CustomFieldDef, FieldDatatype, Group, GroupId, Rule, SubjectId,
    Value,
};
use roster_engine::{
    ConditionRegistry, EngineConfig, MembershipSynchronizer, ResultCache, RuleEvaluator,
};
use roster_store::{
    ConditionStore, GroupStore, MemoryAuditLog, MemoryStore, RuleStore, SubjectStore,
};

struct Env {
    store: MemoryStore,
    evaluator: Arc<RuleEvaluator>,
    synchronizer: MembershipSynchronizer,
}

fn env() -> Env {
    let store = MemoryStore::new();
    let cache = Arc::new(ResultCache::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    let evaluator = Arc::new(RuleEvaluator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ConditionRegistry::with_builtin()),
        cache,
        Arc::new(MemoryAuditLog::new()),
    ));
    let synchronizer = MembershipSynchronizer::new(
        evaluator.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        EngineConfig::default(),
    );
    Env {
        store,
        evaluator,
        synchronizer,
    }
}

fn string_config(pairs: &[(&str, &str)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}

async fn save_condition(store: &MemoryStore, rule: &Rule, kind: &str, config: ConfigMap, position: u32) {
    let mut record = ConditionRecord::new(kind, config);
    record.rule_id = rule.id;
    record.position = position;
    store.save_condition(&record).await.unwrap();
}

async fn enabled_rule(store: &MemoryStore, group: i64) -> Rule {
    store
        .save_group(&Group::new(GroupId(group), format!("Group {group}")))
        .await
        .unwrap();
    let mut rule = Rule::new(format!("rule {group}"), GroupId(group));
    rule.enabled = true;
    store.save_rule(&rule).await.unwrap()
}

#[tokio::test]
async fn test_conditions_intersect() {
    let env = env();
    let rule = enabled_rule(&env.store, 1).await;
    env.store
        .save_group(&Group::new(GroupId(5), "Watched"))
        .await
        .unwrap();

    // Both conditions must hold: username prefix AND membership in
    // group 5.
    save_condition(
        &env.store,
        &rule,
        "profile_field",
        string_config(&[("field", "username"), ("operator", "starts_with"), ("value", "a")]),
        0,
    )
    .await;
    let mut membership = ConfigMap::new();
    membership.insert("operator".to_string(), Value::from("is_member_of"));
    membership.insert("groups".to_string(), Value::List(vec![Value::Int(5)]));
    save_condition(&env.store, &rule, "group_membership", membership, 1).await;

    for (id, name) in [(1, "alice"), (2, "anna"), (3, "bob")] {
        env.store
            .save_subject(&roster_core::Subject::new(SubjectId(id), name))
            .await
            .unwrap();
    }
    // Alice and Bob are in the watched group; only Alice also has the
    // username prefix.
    env.store.add_member(GroupId(5), SubjectId(1)).await.unwrap();
    env.store.add_member(GroupId(5), SubjectId(3)).await.unwrap();

    let matching = env.evaluator.compute_matching_set(&rule, None).await.unwrap();
    assert_eq!(matching, HashSet::from([SubjectId(1)]));
}

#[tokio::test]
async fn test_custom_field_condition_through_evaluator() {
    let env = env();
    let rule = enabled_rule(&env.store, 1).await;

    env.store
        .define_custom_field(CustomFieldDef {
            shortname: "team".to_string(),
            name: "Team".to_string(),
            datatype: FieldDatatype::Text,
        })
        .await
        .unwrap();
    save_condition(
        &env.store,
        &rule,
        "custom_profile_field",
        string_config(&[("field", "team"), ("operator", "equals"), ("value", "platform")]),
        0,
    )
    .await;

    let mut on_team = roster_core::Subject::new(SubjectId(1), "alice");
    on_team.custom.insert("team".to_string(), "Platform".to_string());
    env.store.save_subject(&on_team).await.unwrap();

    // No custom value at all: the joined value is null and never
    // matches.
    env.store
        .save_subject(&roster_core::Subject::new(SubjectId(2), "bob"))
        .await
        .unwrap();

    let matching = env.evaluator.compute_matching_set(&rule, None).await.unwrap();
    assert_eq!(matching, HashSet::from([SubjectId(1)]));
}

#[tokio::test]
async fn test_deleted_subjects_never_match() {
    let env = env();
    let rule = enabled_rule(&env.store, 1).await;
    save_condition(
        &env.store,
        &rule,
        "profile_field",
        string_config(&[("field", "username"), ("operator", "is_not_empty")]),
        0,
    )
    .await;

    let mut gone = roster_core::Subject::new(SubjectId(1), "alice");
    gone.deleted = true;
    env.store.save_subject(&gone).await.unwrap();
    env.store
        .save_subject(&roster_core::Subject::new(SubjectId(2), "bob"))
        .await
        .unwrap();

    let matching = env.evaluator.compute_matching_set(&rule, None).await.unwrap();
    assert_eq!(matching, HashSet::from([SubjectId(2)]));
}

#[tokio::test]
async fn test_negated_membership_with_sync() {
    let env = env();
    let rule = enabled_rule(&env.store, 1).await;
    env.store
        .save_group(&Group::new(GroupId(5), "Excluded"))
        .await
        .unwrap();

    let mut membership = ConfigMap::new();
    membership.insert("operator".to_string(), Value::from("is_not_member_of"));
    membership.insert("groups".to_string(), Value::List(vec![Value::Int(5)]));
    save_condition(&env.store, &rule, "group_membership", membership, 0).await;

    env.store
        .save_subject(&roster_core::Subject::new(SubjectId(1), "alice"))
        .await
        .unwrap();
    env.store
        .save_subject(&roster_core::Subject::new(SubjectId(2), "bob"))
        .await
        .unwrap();
    env.store.add_member(GroupId(5), SubjectId(2)).await.unwrap();

    let outcome = env.synchronizer.sync(&rule, None).await.unwrap();
    assert_eq!(outcome.added, 1);

    let members = env.store.members(GroupId(1), None).await.unwrap();
    assert_eq!(members, HashSet::from([SubjectId(1)]));

    // Bob leaves the excluded group; an incremental sync picks him up.
    env.store.remove_member(GroupId(5), SubjectId(2)).await.unwrap();
    env.synchronizer.sync(&rule, Some(SubjectId(2))).await.unwrap();

    let members = env.store.members(GroupId(1), None).await.unwrap();
    assert_eq!(members, HashSet::from([SubjectId(1), SubjectId(2)]));
}

#[tokio::test]
async fn test_menu_misconfiguration_breaks_rule_on_evaluation() {
    let env = env();
    let rule = enabled_rule(&env.store, 1).await;

    env.store
        .define_custom_field(CustomFieldDef {
            shortname: "campus".to_string(),
            name: "Campus".to_string(),
            datatype: FieldDatatype::Menu(vec!["North".to_string()]),
        })
        .await
        .unwrap();
    // A containment operator is not admissible for a menu field.
    save_condition(
        &env.store,
        &rule,
        "custom_profile_field",
        string_config(&[("field", "campus"), ("operator", "contains"), ("value", "North")]),
        0,
    )
    .await;

    let matching = env.evaluator.compute_matching_set(&rule, None).await.unwrap();
    assert!(matching.is_empty());

    let stored = env.store.get_rule(rule.id).await.unwrap().unwrap();
    assert!(stored.broken);
    assert!(!stored.enabled);
}
