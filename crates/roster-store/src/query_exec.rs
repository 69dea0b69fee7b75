//! Composed-query interpretation
//!
//! The in-memory subject store executes a [`SubjectQuery`] by
//! interpreting its joins and predicate directly against each subject.
//! Join semantics follow outer joins: a custom-field join with no row
//! carries a null value, and null never compares true under any
//! operator.

use std::collections::{HashMap, HashSet};

use roster_core::{
    Bindings, FieldRef, GroupId, Join, JoinSource, Predicate, QueryError, Subject, SubjectId,
    SubjectQuery, TextOp,
};

/// Resolved join rows for one subject, keyed by join alias.
enum JoinRow {
    /// Membership join: a row exists for this subject.
    Present,
    /// Membership join: no row.
    Absent,
    /// Custom-field join: the joined value, `None` when the subject has
    /// no value for the field.
    Value(Option<String>),
}

/// Evaluate a composed query against one subject.
pub(crate) fn subject_matches(
    subject: &Subject,
    query: &SubjectQuery,
    memberships: &HashMap<GroupId, HashSet<SubjectId>>,
) -> Result<bool, QueryError> {
    let rows = resolve_joins(subject, &query.joins, &query.bindings, memberships)?;
    eval(&query.predicate, subject, &rows, &query.bindings)
}

fn resolve_joins(
    subject: &Subject,
    joins: &[Join],
    bindings: &Bindings,
    memberships: &HashMap<GroupId, HashSet<SubjectId>>,
) -> Result<HashMap<String, JoinRow>, QueryError> {
    let mut rows = HashMap::new();

    for join in joins {
        let row = match &join.source {
            JoinSource::GroupMembers { groups_param } => {
                let binding = bindings
                    .get(groups_param)
                    .ok_or_else(|| QueryError::UnknownBinding(groups_param.clone()))?;
                let group_ids =
                    binding
                        .as_group_ids()
                        .ok_or_else(|| QueryError::InvalidBinding {
                            name: groups_param.clone(),
                            expected: "list of group ids",
                        })?;

                let member = group_ids.iter().any(|group_id| {
                    memberships
                        .get(group_id)
                        .is_some_and(|members| members.contains(&subject.id))
                });

                if member {
                    JoinRow::Present
                } else {
                    JoinRow::Absent
                }
            }
            JoinSource::CustomField { field_param } => {
                let binding = bindings
                    .get(field_param)
                    .ok_or_else(|| QueryError::UnknownBinding(field_param.clone()))?;
                let shortname = binding.as_str().ok_or_else(|| QueryError::InvalidBinding {
                    name: field_param.clone(),
                    expected: "field shortname",
                })?;

                JoinRow::Value(subject.custom_field(shortname).map(str::to_string))
            }
        };

        rows.insert(join.alias.clone(), row);
    }

    Ok(rows)
}

fn eval(
    predicate: &Predicate,
    subject: &Subject,
    rows: &HashMap<String, JoinRow>,
    bindings: &Bindings,
) -> Result<bool, QueryError> {
    match predicate {
        Predicate::Active => Ok(!subject.deleted),

        Predicate::MatchNone => Ok(false),

        Predicate::All(items) => {
            for item in items {
                if !eval(item, subject, rows, bindings)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }

        Predicate::Joined { alias, present } => {
            let row = rows
                .get(alias)
                .ok_or_else(|| QueryError::UnknownAlias(alias.clone()))?;
            let has_row = match row {
                JoinRow::Present => true,
                JoinRow::Absent => false,
                JoinRow::Value(value) => value.is_some(),
            };
            Ok(has_row == *present)
        }

        Predicate::Compare { field, op, param } => {
            let expected = bindings
                .get(param)
                .ok_or_else(|| QueryError::UnknownBinding(param.clone()))?
                .as_str()
                .ok_or_else(|| QueryError::InvalidBinding {
                    name: param.clone(),
                    expected: "string",
                })?;

            let actual = match field {
                FieldRef::Standard(name) => subject
                    .standard_field(name)
                    .ok_or_else(|| QueryError::UnsupportedField(name.clone()))?,
                FieldRef::Joined { alias } => {
                    match rows
                        .get(alias)
                        .ok_or_else(|| QueryError::UnknownAlias(alias.clone()))?
                    {
                        JoinRow::Value(Some(value)) => value.as_str(),
                        // Null join value: no operator matches it.
                        JoinRow::Value(None) => return Ok(false),
                        JoinRow::Present | JoinRow::Absent => {
                            return Err(QueryError::UnsupportedField(format!(
                                "join {alias} carries no comparable value"
                            )))
                        }
                    }
                }
            };

            Ok(compare_text(actual, *op, expected))
        }
    }
}

/// Case-insensitive text comparison.
fn compare_text(actual: &str, op: TextOp, expected: &str) -> bool {
    let actual = actual.to_lowercase();
    let expected = expected.to_lowercase();

    match op {
        TextOp::Contains => actual.contains(&expected),
        TextOp::NotContains => !actual.contains(&expected),
        TextOp::Equals => actual == expected,
        TextOp::NotEquals => actual != expected,
        TextOp::StartsWith => actual.starts_with(&expected),
        TextOp::EndsWith => actual.ends_with(&expected),
        TextOp::IsEmpty => actual.is_empty(),
        TextOp::IsNotEmpty => !actual.is_empty(),
    }
}
