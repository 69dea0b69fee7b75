//! End-to-end scenarios through the RosterSync façade

mod common;

use std::collections::HashSet;

use common::{membership_condition, profile_condition, TestEnv};
use roster_sdk::{
    AuditEvent, DomainEvent, EngineError, EventKind, GroupId, GroupStore, MatchStatus, MatchStore,
    PageRequest, Rule, RuleDraft, RuleId, SubjectId,
};

async fn enabled_rule(env: &TestEnv, draft: &RuleDraft) -> Rule {
    let rule = env.service.save_rule(draft).await.unwrap();
    env.service.set_rule_enabled(rule.id, true).await.unwrap()
}

#[tokio::test]
async fn test_profile_rule_takes_over_group() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    let alice = env.add_subject(1, "alice").await;
    let bob = env.add_subject(2, "bob").await;

    // The group starts with a stale member.
    env.store.add_member(group, bob).await.unwrap();

    let rule = enabled_rule(
        &env,
        &RuleDraft::create("Alice only", group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;

    env.service.evaluate_and_sync(rule.id).await.unwrap();

    let members = env.store.members(group, None).await.unwrap();
    assert_eq!(members, HashSet::from([alice]));

    let alice_match = env.store.get_match(rule.id, alice).await.unwrap().unwrap();
    assert_eq!(alice_match.status, MatchStatus::Matching);
    assert!(alice_match.unmatched_at.is_none());

    let bob_match = env.store.get_match(rule.id, bob).await.unwrap().unwrap();
    assert_eq!(bob_match.status, MatchStatus::Unmatching);
    assert!(bob_match.unmatched_at.is_some());
}

#[tokio::test]
async fn test_externally_deleted_group_breaks_rule_without_error() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    env.add_subject(1, "alice").await;

    let rule = enabled_rule(
        &env,
        &RuleDraft::create("Alice only", group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;

    env.store.delete_group(group).await.unwrap();

    // The call succeeds; the failure becomes state.
    env.service.evaluate_and_sync(rule.id).await.unwrap();

    let stored = env.service.get_rule(rule.id).await.unwrap().unwrap();
    assert!(stored.broken);
    assert!(!stored.enabled);
}

#[tokio::test]
async fn test_event_fan_out_targets_subscribed_rules_only() {
    let env = TestEnv::new();
    let profile_group = env.add_group(1, "By profile").await;
    let watched = env.add_group(3, "Watched").await;
    let membership_group = env.add_group(2, "By membership").await;

    enabled_rule(
        &env,
        &RuleDraft::create("By profile", profile_group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;
    enabled_rule(
        &env,
        &RuleDraft::create("By membership", membership_group)
            .with_condition(membership_condition("is_member_of", &[3])),
    )
    .await;

    let alice = env.add_subject(1, "alice").await;

    env.service
        .handle_event(&DomainEvent::for_subject(EventKind::SubjectUpdated, alice))
        .await
        .unwrap();

    // The profile rule picked Alice up; the membership rule (not
    // subscribed to profile events) did not run.
    let members = env.store.members(profile_group, None).await.unwrap();
    assert_eq!(members, HashSet::from([alice]));
    assert!(env.store.members(membership_group, None).await.unwrap().is_empty());

    // A membership event now cascades into the watching rule.
    env.store.add_member(watched, alice).await.unwrap();
    env.service
        .handle_event(&DomainEvent::for_subject(EventKind::GroupMemberAdded, alice))
        .await
        .unwrap();

    let members = env.store.members(membership_group, None).await.unwrap();
    assert_eq!(members, HashSet::from([alice]));

    // The scoped sync left other subjects untouched.
    assert_eq!(env.store.members(profile_group, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_stale_cache_after_rule_creation() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    let alice = env.add_subject(1, "alice").await;

    // Prime the cache with an empty lookup for profile conditions.
    env.service
        .handle_event(&DomainEvent::for_subject(EventKind::SubjectUpdated, alice))
        .await
        .unwrap();
    assert!(env.store.members(group, None).await.unwrap().is_empty());

    // Creating the rule invalidates; the next event must see it.
    enabled_rule(
        &env,
        &RuleDraft::create("Alice only", group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;

    env.service
        .handle_event(&DomainEvent::for_subject(EventKind::SubjectUpdated, alice))
        .await
        .unwrap();

    let members = env.store.members(group, None).await.unwrap();
    assert_eq!(members, HashSet::from([alice]));
}

#[tokio::test]
async fn test_sweep_processes_every_enabled_rule() {
    let env = TestEnv::new();
    let first_group = env.add_group(1, "First").await;
    let second_group = env.add_group(2, "Second").await;
    let alice = env.add_subject(1, "alice").await;
    let bob = env.add_subject(2, "bob").await;

    enabled_rule(
        &env,
        &RuleDraft::create("First", first_group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;
    enabled_rule(
        &env,
        &RuleDraft::create("Second", second_group)
            .with_condition(profile_condition("username", "equals", "bob")),
    )
    .await;

    let report = env.service.process_all_rules().await.unwrap();
    assert_eq!(report.rules_processed, 2);
    assert_eq!(report.rules_failed, 0);

    assert_eq!(
        env.store.members(first_group, None).await.unwrap(),
        HashSet::from([alice])
    );
    assert_eq!(
        env.store.members(second_group, None).await.unwrap(),
        HashSet::from([bob])
    );

    // Idempotent: a second sweep changes nothing.
    let report = env.service.process_all_rules().await.unwrap();
    assert_eq!(report.rules_processed, 2);
    assert_eq!(
        env.store.members(first_group, None).await.unwrap(),
        HashSet::from([alice])
    );
}

#[tokio::test]
async fn test_one_broken_rule_does_not_stop_the_sweep() {
    let env = TestEnv::new();
    let broken_group = env.add_group(1, "Broken").await;
    let healthy_group = env.add_group(2, "Healthy").await;
    let doomed = env.add_group(3, "Doomed").await;
    let alice = env.add_subject(1, "alice").await;

    // This rule watches a group that is about to disappear.
    enabled_rule(
        &env,
        &RuleDraft::create("Broken", broken_group)
            .with_condition(membership_condition("is_member_of", &[3])),
    )
    .await;
    enabled_rule(
        &env,
        &RuleDraft::create("Healthy", healthy_group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;

    env.store.delete_group(doomed).await.unwrap();

    let report = env.service.process_all_rules().await.unwrap();
    assert_eq!(report.rules_processed, 2);
    assert_eq!(report.rules_failed, 0);

    // The healthy rule still synchronized.
    assert_eq!(
        env.store.members(healthy_group, None).await.unwrap(),
        HashSet::from([alice])
    );

    // The other rule turned broken instead of aborting the sweep.
    let rules = env.service.list_rules().await.unwrap();
    let broken_rule = rules.iter().find(|rule| rule.name == "Broken").unwrap();
    assert!(broken_rule.broken);
}

#[tokio::test]
async fn test_count_and_list_matching_subjects() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    for (id, name) in [(1, "amy_x"), (2, "ann_x"), (3, "bob"), (4, "abe_x")] {
        env.add_subject(id, name).await;
    }

    let rule = env
        .service
        .save_rule(
            &RuleDraft::create("Usernames ending in x", group)
                .with_condition(profile_condition("username", "ends_with", "x")),
        )
        .await
        .unwrap();

    // Projections work without enabling the rule and mutate nothing.
    let count = env.service.count_matching_subjects(rule.id).await.unwrap();
    assert_eq!(count, 3);

    let page = env
        .service
        .list_matching_subjects(rule.id, PageRequest::first(2))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, SubjectId(1));
    assert_eq!(page.items[1].id, SubjectId(2));

    let rest = env
        .service
        .list_matching_subjects(rule.id, PageRequest { offset: 2, limit: 2 })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].id, SubjectId(4));

    assert!(env.store.members(group, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reservation_conflict_surfaces_to_caller() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;

    env.service
        .save_rule(&RuleDraft::create("First", group))
        .await
        .unwrap();

    let err = env
        .service
        .save_rule(&RuleDraft::create("Second", group))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("already managed"), "got: {message}");
}

#[tokio::test]
async fn test_delete_rule_cascade_through_facade() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    let alice = env.add_subject(1, "alice").await;

    let rule = enabled_rule(
        &env,
        &RuleDraft::create("Alice only", group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;
    env.service.evaluate_and_sync(rule.id).await.unwrap();
    assert_eq!(
        env.store.members(group, None).await.unwrap(),
        HashSet::from([alice])
    );

    env.service.delete_rule(rule.id).await.unwrap();

    assert!(env.service.get_rule(rule.id).await.unwrap().is_none());
    assert!(env.store.list_matches(rule.id).await.unwrap().is_empty());
    assert!(!env
        .store
        .get_group(group)
        .await
        .unwrap()
        .unwrap()
        .is_managed());

    let entries = env.audit.entries().await;
    assert!(entries.contains(&AuditEvent::RuleDeleted { rule_id: rule.id }));
}

#[tokio::test]
async fn test_unknown_rule_is_an_error() {
    let env = TestEnv::new();
    let err = env.service.evaluate_and_sync(RuleId(99)).await.unwrap_err();
    assert!(matches!(
        err,
        roster_sdk::SdkError::Engine(EngineError::RuleNotFound(RuleId(99)))
    ));
}

#[tokio::test]
async fn test_group_deletion_is_a_silent_broken_transition() {
    let env = TestEnv::new();
    let group = env.add_group(1, "Staff").await;
    env.add_subject(1, "alice").await;

    let rule = enabled_rule(
        &env,
        &RuleDraft::create("Alice only", group)
            .with_condition(profile_condition("username", "equals", "alice")),
    )
    .await;

    // A vanished target group flips the broken flag without a
    // matching-failed notice; those are reserved for query execution
    // errors.
    env.store.delete_group(GroupId(1)).await.unwrap();
    env.service.evaluate_and_sync(rule.id).await.unwrap();

    let failures = env.audit.matching_failures().await;
    assert!(failures.is_empty());
    assert!(env.service.get_rule(rule.id).await.unwrap().unwrap().broken);
}
