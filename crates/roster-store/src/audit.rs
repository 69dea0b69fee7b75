//! Audit/notification side channel
//!
//! The engine reports rule and condition lifecycle changes plus
//! evaluation failures here. What a deployment does with them
//! (structured log, message bus, admin UI feed) is up to the sink
//! implementation.

use async_trait::async_trait;
use roster_core::RuleId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;

/// An auditable occurrence in the rule lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RuleCreated {
        rule_id: RuleId,
    },
    RuleUpdated {
        rule_id: RuleId,
    },
    RuleDeleted {
        rule_id: RuleId,
    },
    ConditionCreated {
        rule_id: RuleId,
        name: String,
        description: String,
    },
    ConditionUpdated {
        rule_id: RuleId,
        name: String,
        description: String,
        previous_description: String,
    },
    ConditionDeleted {
        rule_id: RuleId,
        name: String,
        description: String,
    },
    /// Evaluating a rule failed and the rule was marked broken.
    MatchingFailed {
        rule_id: RuleId,
        error: String,
    },
}

/// Receiver for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one event.
    async fn record(&self, event: AuditEvent) -> Result<()>;
}

/// In-memory audit log, mainly for tests and development.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub async fn entries(&self) -> Vec<AuditEvent> {
        self.entries.read().await.clone()
    }

    /// Evaluation failures only, as (rule id, error) pairs.
    pub async fn matching_failures(&self) -> Vec<(RuleId, String)> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|event| match event {
                AuditEvent::MatchingFailed { rule_id, error } => {
                    Some((*rule_id, error.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        self.entries.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_log_records_in_order() {
        let log = MemoryAuditLog::new();
        log.record(AuditEvent::RuleCreated { rule_id: RuleId(1) })
            .await
            .unwrap();
        log.record(AuditEvent::MatchingFailed {
            rule_id: RuleId(1),
            error: "boom".to_string(),
        })
        .await
        .unwrap();

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], AuditEvent::RuleCreated { rule_id: RuleId(1) });

        let failures = log.matching_failures().await;
        assert_eq!(failures, vec![(RuleId(1), "boom".to_string())]);
    }
}
