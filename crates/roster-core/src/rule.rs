//! Rule definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupId, RuleId};

/// A rule keeps one target group synchronized with the set of subjects
/// matching its ordered condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Identifier, `0` until first saved.
    pub id: RuleId,

    /// Human-readable name.
    pub name: String,

    /// Whether the rule takes part in evaluation. Broken rules are
    /// always disabled.
    pub enabled: bool,

    /// Health flag, see [`Rule::mark_broken`].
    pub broken: bool,

    /// The target group this rule manages.
    pub group_id: GroupId,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Set by the store on create.
    pub created_at: DateTime<Utc>,

    /// Set by the store on every save.
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Create a new, not yet persisted rule. New rules start disabled;
    /// an operator enables them explicitly after review.
    pub fn new(name: impl Into<String>, group_id: GroupId) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::default(),
            name: name.into(),
            enabled: false,
            broken: false,
            group_id,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the rule is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the rule is both enabled and healthy.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.broken
    }

    /// Transition to the broken state. Broken rules are never active,
    /// so this also forces the rule disabled.
    pub fn mark_broken(&mut self) {
        self.broken = true;
        self.enabled = false;
    }

    /// Transition back to healthy. Does not re-enable the rule; that is
    /// a separate operator decision.
    pub fn mark_unbroken(&mut self) {
        self.broken = false;
    }
}
