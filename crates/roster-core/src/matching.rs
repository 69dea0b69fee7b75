//! Match history records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RuleId, SubjectId};

/// Whether the subject currently matches the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// The subject is in the rule's computed set.
    Matching,
    /// The subject left the computed set.
    Unmatching,
}

/// Historical record of a subject's matched/unmatched transitions
/// against one rule. Updated by the synchronizer, deleted only by the
/// rule deletion cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The rule the subject matched.
    pub rule_id: RuleId,

    /// The matched subject.
    pub subject_id: SubjectId,

    /// When the subject last entered the computed set.
    pub matched_at: DateTime<Utc>,

    /// When the subject last left the computed set, if it has.
    pub unmatched_at: Option<DateTime<Utc>>,

    /// Current status.
    pub status: MatchStatus,
}

impl MatchRecord {
    /// Create a record for a subject that just entered the computed set.
    pub fn matched(rule_id: RuleId, subject_id: SubjectId, at: DateTime<Utc>) -> Self {
        Self {
            rule_id,
            subject_id,
            matched_at: at,
            unmatched_at: None,
            status: MatchStatus::Matching,
        }
    }

    /// Record that the subject re-entered the computed set.
    pub fn rematch(&mut self, at: DateTime<Utc>) {
        self.matched_at = at;
        self.unmatched_at = None;
        self.status = MatchStatus::Matching;
    }

    /// Record that the subject left the computed set. The record is
    /// kept, never deleted.
    pub fn unmatch(&mut self, at: DateTime<Utc>) {
        self.unmatched_at = Some(at);
        self.status = MatchStatus::Unmatching;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_then_unmatch() {
        let start = Utc::now();
        let mut record = MatchRecord::matched(RuleId(1), SubjectId(2), start);
        assert_eq!(record.status, MatchStatus::Matching);
        assert!(record.unmatched_at.is_none());

        let later = Utc::now();
        record.unmatch(later);
        assert_eq!(record.status, MatchStatus::Unmatching);
        assert_eq!(record.unmatched_at, Some(later));

        let again = Utc::now();
        record.rematch(again);
        assert_eq!(record.status, MatchStatus::Matching);
        assert_eq!(record.matched_at, again);
        assert!(record.unmatched_at.is_none());
    }
}
