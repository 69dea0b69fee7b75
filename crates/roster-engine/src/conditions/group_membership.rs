//! Group membership condition
//!
//! Matches subjects by membership (or non-membership) in a set of
//! configured groups. A condition configured against the owning rule's
//! own target group would feed the rule's output back into its input,
//! so that configuration is treated as broken.

use async_trait::async_trait;
use roster_core::{
    AliasAllocator, Bindings, ConfigMap, EventKind, FieldError, GroupId, Join, JoinSource,
    Predicate, QueryFragment, Value,
};

use super::{Condition, ConditionContext};

/// Kind tag of the group membership condition.
pub const GROUP_MEMBERSHIP: &str = "group_membership";

const SUBSCRIBED: &[EventKind] = &[EventKind::GroupMemberAdded, EventKind::GroupMemberRemoved];

/// Membership comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MembershipOp {
    IsMemberOf,
    IsNotMemberOf,
}

impl MembershipOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "is_member_of" => Some(MembershipOp::IsMemberOf),
            "is_not_member_of" => Some(MembershipOp::IsNotMemberOf),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            MembershipOp::IsMemberOf => "is member of",
            MembershipOp::IsNotMemberOf => "is not member of",
        }
    }
}

/// Condition on membership in configured groups.
pub struct GroupMembershipCondition {
    config: ConfigMap,
}

impl GroupMembershipCondition {
    pub fn new(config: ConfigMap) -> Self {
        Self { config }
    }

    fn operator(&self) -> MembershipOp {
        self.config
            .get("operator")
            .and_then(Value::as_str)
            .and_then(MembershipOp::parse)
            .unwrap_or(MembershipOp::IsMemberOf)
    }

    fn groups(&self) -> Vec<GroupId> {
        self.config
            .get("groups")
            .and_then(Value::as_group_ids)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Condition for GroupMembershipCondition {
    fn kind(&self) -> &str {
        GROUP_MEMBERSHIP
    }

    fn name(&self) -> String {
        "Group membership".to_string()
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.groups().is_empty() {
            errors.push(FieldError::new("groups", "Please select at least one group"));
        }

        if let Some(raw) = self.config.get("operator") {
            let known = raw.as_str().map(MembershipOp::parse);
            if !matches!(known, Some(Some(_))) {
                errors.push(FieldError::new("operator", "Unknown operator"));
            }
        }

        errors
    }

    fn subscribed_events(&self) -> &'static [EventKind] {
        SUBSCRIBED
    }

    async fn is_broken(&self, ctx: &ConditionContext<'_>) -> bool {
        // Every configured group must still exist.
        for group_id in self.groups() {
            match ctx.groups.get_group(group_id).await {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => return true,
            }
        }

        // A rule must not observe the group it manages.
        if let Some(rule) = ctx.rule {
            if self.groups().contains(&rule.group_id) {
                return true;
            }
        }

        false
    }

    async fn describe(&self, ctx: &ConditionContext<'_>) -> String {
        let mut names = Vec::new();
        for group_id in self.groups() {
            let name = match ctx.groups.get_group(group_id).await {
                Ok(Some(group)) => format!("'{}'", group.name),
                _ => group_id.to_string(),
            };
            names.push(name);
        }

        format!("{} {}", self.operator().describe(), names.join(" or "))
    }

    fn to_query_fragment(&self, aliases: &mut AliasAllocator) -> QueryFragment {
        let groups = self.groups();
        if groups.is_empty() {
            return QueryFragment::match_none();
        }

        let groups_param = aliases.param();
        let alias = aliases.table();

        let mut bindings = Bindings::new();
        bindings.insert(groups_param.clone(), Value::from_group_ids(&groups));

        QueryFragment {
            join: Some(Join {
                alias: alias.clone(),
                source: JoinSource::GroupMembers { groups_param },
            }),
            predicate: Some(Predicate::Joined {
                alias,
                present: self.operator() == MembershipOp::IsMemberOf,
            }),
            bindings,
        }
    }
}
