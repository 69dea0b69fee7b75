//! Persisted condition records
//!
//! A condition record stores a kind tag and an opaque configuration
//! blob. The matching behavior is resolved at runtime by looking the
//! tag up in the condition registry and attaching the configuration to
//! the behavior object.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ConditionId, RuleId, Value};

/// Kind-specific configuration, stored as an opaque key/value map.
pub type ConfigMap = HashMap<String, Value>;

/// One persisted condition of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    /// Identifier, `0` until first saved.
    pub id: ConditionId,

    /// The owning rule, `0` for a record not yet attached to a rule.
    pub rule_id: RuleId,

    /// Kind tag, resolved through the condition registry. An unknown
    /// tag makes the condition unresolvable and therefore broken.
    pub kind: String,

    /// Kind-specific configuration.
    pub config: ConfigMap,

    /// Concatenation position within the rule. Unique per rule and
    /// densely renumbered on every save.
    pub position: u32,
}

impl ConditionRecord {
    /// Create a new, not yet persisted condition record.
    pub fn new(kind: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            id: ConditionId::default(),
            rule_id: RuleId::default(),
            kind: kind.into(),
            config,
            position: 0,
        }
    }

    /// Render the raw configuration for display of conditions whose
    /// behavior cannot be resolved or is broken.
    pub fn raw_config(&self) -> String {
        serde_json::to_string(&self.config).unwrap_or_else(|_| "{}".to_string())
    }
}
