//! Domain events that drive incremental re-evaluation

use serde::{Deserialize, Serialize};

use crate::types::SubjectId;

/// Kinds of domain events condition behaviors can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A subject was created.
    SubjectCreated,
    /// A subject's profile was updated.
    SubjectUpdated,
    /// A subject was added to a group.
    GroupMemberAdded,
    /// A subject was removed from a group.
    GroupMemberRemoved,
}

/// A typed domain event, optionally scoped to a single subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event kind.
    pub kind: EventKind,
    /// The affected subject, or `None` for population-wide events.
    pub subject: Option<SubjectId>,
}

impl DomainEvent {
    /// An event about a single subject.
    pub fn for_subject(kind: EventKind, subject: SubjectId) -> Self {
        Self {
            kind,
            subject: Some(subject),
        }
    }

    /// A population-wide event with no single subject attached.
    pub fn population(kind: EventKind) -> Self {
        Self {
            kind,
            subject: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let scoped = DomainEvent::for_subject(EventKind::SubjectUpdated, SubjectId(3));
        assert_eq!(scoped.subject, Some(SubjectId(3)));

        let wide = DomainEvent::population(EventKind::GroupMemberAdded);
        assert_eq!(wide.subject, None);
    }

    #[test]
    fn test_event_kind_serde() {
        let json = serde_json::to_string(&EventKind::SubjectCreated).unwrap();
        assert_eq!(json, "\"subject_created\"");
    }
}
