//! Structured query model
//!
//! Conditions compile their configuration into a [`QueryFragment`]; the
//! query composer merges the fragments of one rule into a single
//! [`SubjectQuery`] the subject-population store can execute. The model
//! is deliberately storage-agnostic: a SQL backend would render joins
//! and predicates to SQL, the in-memory reference store interprets them
//! directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{SubjectId, Value};

/// Name→value parameter bindings referenced by predicates and joins.
///
/// Binding names must be globally unique across all fragments merged
/// into one query; fragment producers obtain them from the
/// [`AliasAllocator`] scoped to the composition.
pub type Bindings = HashMap<String, Value>;

/// Allocates parameter and join aliases unique within one query
/// composition. Passed by the composer into every fragment-producing
/// call.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    params: u32,
    tables: u32,
}

impl AliasAllocator {
    /// Create a fresh allocator for one composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next parameter alias: `p0`, `p1`, ...
    pub fn param(&mut self) -> String {
        let alias = format!("p{}", self.params);
        self.params += 1;
        alias
    }

    /// Next join alias: `t0`, `t1`, ...
    pub fn table(&mut self) -> String {
        let alias = format!("t{}", self.tables);
        self.tables += 1;
        alias
    }
}

/// Comparison operators for text-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOp {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

impl TextOp {
    /// Parse the snake_case form stored in condition configuration.
    pub fn parse(raw: &str) -> Option<Self> {
        let op = match raw {
            "contains" => TextOp::Contains,
            "not_contains" => TextOp::NotContains,
            "equals" => TextOp::Equals,
            "not_equals" => TextOp::NotEquals,
            "starts_with" => TextOp::StartsWith,
            "ends_with" => TextOp::EndsWith,
            "is_empty" => TextOp::IsEmpty,
            "is_not_empty" => TextOp::IsNotEmpty,
            _ => return None,
        };
        Some(op)
    }

    /// Operators that compare against no value.
    pub fn is_emptiness(&self) -> bool {
        matches!(self, TextOp::IsEmpty | TextOp::IsNotEmpty)
    }

    /// Operators admissible for menu-typed fields.
    pub fn supports_menu(&self) -> bool {
        matches!(self, TextOp::Equals | TextOp::NotEquals)
    }

    /// Human-readable rendering used in condition descriptions.
    pub fn describe(&self) -> &'static str {
        match self {
            TextOp::Contains => "contains",
            TextOp::NotContains => "doesn't contain",
            TextOp::Equals => "is equal to",
            TextOp::NotEquals => "isn't equal to",
            TextOp::StartsWith => "starts with",
            TextOp::EndsWith => "ends with",
            TextOp::IsEmpty => "is empty",
            TextOp::IsNotEmpty => "is not empty",
        }
    }
}

/// The field a compare predicate targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldRef {
    /// A standard profile field on the base subject row.
    Standard(String),
    /// The value carried by the join row with the given alias.
    Joined { alias: String },
}

/// Source of rows for a join clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinSource {
    /// One row per subject that is a member of any group listed in the
    /// named binding (a list of group ids).
    GroupMembers { groups_param: String },

    /// One row per subject carrying its value for the custom field
    /// named by the binding.
    CustomField { field_param: String },
}

/// A join clause contributed by a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Alias predicates use to reference the joined rows. Unique within
    /// one composed query.
    pub alias: String,
    /// Where the joined rows come from.
    pub source: JoinSource,
}

/// An evaluable predicate over one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// The base restriction to active (not soft-deleted) subjects.
    Active,

    /// Compare a field against the value bound under `param`.
    Compare {
        field: FieldRef,
        op: TextOp,
        param: String,
    },

    /// Outer-join presence test: true when a join row for `alias`
    /// exists (`present`) or does not (`!present`).
    Joined { alias: String, present: bool },

    /// Matches no subject. Conditions emit this defensively when their
    /// configuration turns out unusable at fragment-build time; ANDed
    /// into the composed predicate it conservatively empties the
    /// result.
    MatchNone,

    /// Conjunction; each element is evaluated independently.
    All(Vec<Predicate>),
}

/// A condition's compiled contribution to the composed query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryFragment {
    /// Optional join clause.
    pub join: Option<Join>,

    /// Optional predicate clause.
    pub predicate: Option<Predicate>,

    /// Parameter bindings referenced by the join and predicate.
    #[serde(default)]
    pub bindings: Bindings,
}

impl QueryFragment {
    /// A fragment with only a predicate.
    pub fn predicate(predicate: Predicate, bindings: Bindings) -> Self {
        Self {
            join: None,
            predicate: Some(predicate),
            bindings,
        }
    }

    /// A fragment that excludes every subject. The conservative output
    /// of a condition that detects its own misconfiguration.
    pub fn match_none() -> Self {
        Self {
            join: None,
            predicate: Some(Predicate::MatchNone),
            bindings: Bindings::new(),
        }
    }
}

/// The merged, evaluable query for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectQuery {
    /// Accumulated join clauses, in condition position order.
    pub joins: Vec<Join>,

    /// The composed predicate. Always includes [`Predicate::Active`].
    pub predicate: Predicate,

    /// Merged parameter bindings.
    pub bindings: Bindings,

    /// Optional narrowing to a single subject, used for incremental
    /// re-evaluation.
    pub subject: Option<SubjectId>,
}

impl SubjectQuery {
    /// A query that matches no subjects at all. Used when a rule has no
    /// conditions: zero conditions mean "not yet actionable", not "no
    /// restriction".
    pub fn match_none() -> Self {
        Self {
            joins: Vec::new(),
            predicate: Predicate::All(vec![Predicate::Active, Predicate::MatchNone]),
            bindings: Bindings::new(),
            subject: None,
        }
    }

    /// Narrow the query to a single subject.
    pub fn scoped_to(mut self, subject: Option<SubjectId>) -> Self {
        self.subject = subject;
        self
    }
}
