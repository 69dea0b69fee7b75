//! Stand-in behavior for unknown condition kinds
//!
//! When a record's kind tag does not resolve in the registry (the kind
//! was removed, or the record came from a newer deployment) the
//! condition is inert: always broken, contributing nothing, subscribed
//! to nothing. Returning this behavior instead of an error keeps the
//! rest of the engine free of "what if the kind is missing" branches.

use async_trait::async_trait;
use roster_core::{AliasAllocator, ConfigMap, EventKind, FieldError, QueryFragment};

use super::{Condition, ConditionContext};

/// Behavior attached to records whose kind tag failed to resolve.
pub struct UnresolvedCondition {
    kind: String,
    config: ConfigMap,
}

impl UnresolvedCondition {
    pub fn new(kind: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            kind: kind.into(),
            config,
        }
    }
}

#[async_trait]
impl Condition for UnresolvedCondition {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn name(&self) -> String {
        // Echo the raw tag; there is nothing better to show.
        self.kind.clone()
    }

    fn validate(&self) -> Vec<FieldError> {
        vec![FieldError::new(
            "kind",
            format!("Unknown condition kind: {}", self.kind),
        )]
    }

    fn subscribed_events(&self) -> &'static [EventKind] {
        &[]
    }

    async fn is_broken(&self, _ctx: &ConditionContext<'_>) -> bool {
        true
    }

    async fn describe(&self, _ctx: &ConditionContext<'_>) -> String {
        serde_json::to_string(&self.config).unwrap_or_else(|_| "{}".to_string())
    }

    fn to_query_fragment(&self, _aliases: &mut AliasAllocator) -> QueryFragment {
        QueryFragment::match_none()
    }
}
