//! Event dispatcher
//!
//! Entry point for domain events: maps an event to the condition kinds
//! subscribed to it, then (through the result cache) to the enabled
//! rules containing such conditions, then re-synchronizes each affected
//! rule scoped to the event's subject.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use roster_core::{DomainEvent, Rule, RuleId};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::registry::ConditionRegistry;
use crate::sync::MembershipSynchronizer;
use crate::Result;

/// Fans domain events out to affected rules.
pub struct EventDispatcher {
    registry: Arc<ConditionRegistry>,
    cache: Arc<ResultCache>,
    synchronizer: Arc<MembershipSynchronizer>,
}

impl EventDispatcher {
    pub fn new(
        registry: Arc<ConditionRegistry>,
        cache: Arc<ResultCache>,
        synchronizer: Arc<MembershipSynchronizer>,
    ) -> Self {
        Self {
            registry,
            cache,
            synchronizer,
        }
    }

    /// Handle one domain event.
    ///
    /// Each affected rule is synchronized exactly once, even when
    /// several of its condition kinds subscribe to the event. Rules are
    /// processed concurrently; a failing rule is logged and never
    /// aborts the fan-out. Per-rule ordering is guaranteed by the
    /// synchronizer's rule lock, cross-rule ordering is not.
    pub async fn handle_event(&self, event: &DomainEvent) -> Result<()> {
        let mut affected: HashMap<RuleId, Rule> = HashMap::new();

        for kind in self.registry.kinds_subscribed_to(event.kind) {
            for rule in self.cache.rules_referencing_kind(&kind).await? {
                affected.entry(rule.id).or_insert(rule);
            }
        }

        if affected.is_empty() {
            return Ok(());
        }
        debug!(kind = ?event.kind, rules = affected.len(), "dispatching event");

        let syncs = affected.into_values().map(|rule| {
            let synchronizer = self.synchronizer.clone();
            let subject = event.subject;
            async move {
                if let Err(error) = synchronizer.sync(&rule, subject).await {
                    warn!(rule_id = %rule.id, %error, "event-driven sync failed");
                }
            }
        });
        join_all(syncs).await;

        Ok(())
    }
}
