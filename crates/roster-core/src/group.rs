//! Target group definitions

use serde::{Deserialize, Serialize};

use crate::types::GroupId;

/// Marker stored in a group's `managed_by` field while a rule keeps the
/// group synchronized.
pub const MANAGED_BY: &str = "rostersync";

/// An externally owned membership roster a rule can manage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Identifier.
    pub id: GroupId,

    /// Human-readable name.
    pub name: String,

    /// Ownership marker. `Some(MANAGED_BY)` while reserved by a rule;
    /// other components may hold their own markers.
    pub managed_by: Option<String>,
}

impl Group {
    /// Create an unmanaged group.
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            managed_by: None,
        }
    }

    /// Whether this group is currently reserved by the rostersync
    /// engine.
    pub fn is_managed(&self) -> bool {
        self.managed_by.as_deref() == Some(MANAGED_BY)
    }

    /// Whether a rule may reserve this group: either unmanaged, or
    /// already reserved by us (the caller still has to check which rule
    /// holds the reservation).
    pub fn is_available(&self) -> bool {
        match self.managed_by.as_deref() {
            None => true,
            Some(marker) => marker == MANAGED_BY,
        }
    }
}
