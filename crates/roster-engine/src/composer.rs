//! Query composer
//!
//! Merges the ordered query fragments of one rule into a single
//! evaluable [`SubjectQuery`]. The caller passes conditions it has
//! already health-checked; a fragment whose predicate excludes
//! everything still participates normally, which conservatively
//! empties the whole result.

use roster_core::{AliasAllocator, Bindings, Predicate, SubjectId, SubjectQuery};

use crate::conditions::Condition;

/// Composes condition fragments into one query.
pub struct QueryComposer;

impl QueryComposer {
    /// Merge the fragments of the given conditions, in list order.
    ///
    /// An empty condition list yields a query matching no subjects:
    /// a rule with no conditions is not yet actionable, which is not
    /// the same as unrestricted.
    pub fn compose(
        conditions: &[Box<dyn Condition>],
        subject: Option<SubjectId>,
    ) -> SubjectQuery {
        if conditions.is_empty() {
            return SubjectQuery::match_none().scoped_to(subject);
        }

        let mut aliases = AliasAllocator::new();
        let mut joins = Vec::new();
        let mut parts = vec![Predicate::Active];
        let mut bindings = Bindings::new();

        for condition in conditions {
            let fragment = condition.to_query_fragment(&mut aliases);

            if let Some(join) = fragment.join {
                joins.push(join);
            }
            if let Some(predicate) = fragment.predicate {
                parts.push(predicate);
            }
            bindings.extend(fragment.bindings);
        }

        SubjectQuery {
            joins,
            predicate: Predicate::All(parts),
            bindings,
            subject,
        }
    }
}
