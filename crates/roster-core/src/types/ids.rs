//! Typed identifiers
//!
//! Identifiers are store-assigned sequential integers. The value `0`
//! marks a record that has not been persisted yet.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// True until the owning store has assigned an identifier.
            pub fn is_unsaved(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                $name(raw)
            }
        }
    };
}

id_type!(
    /// Identifier of a rule.
    RuleId
);
id_type!(
    /// Identifier of a condition record.
    ConditionId
);
id_type!(
    /// Identifier of a subject.
    SubjectId
);
id_type!(
    /// Identifier of a target group.
    GroupId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsaved_marker() {
        assert!(RuleId::default().is_unsaved());
        assert!(!RuleId(7).is_unsaved());
    }

    #[test]
    fn test_display() {
        assert_eq!(SubjectId(42).to_string(), "42");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&GroupId(3)).unwrap();
        assert_eq!(json, "3");
        let back: GroupId = serde_json::from_str("3").unwrap();
        assert_eq!(back, GroupId(3));
    }
}
