//! Profile field conditions
//!
//! Two closely related kinds: one over the standard profile fields
//! every subject carries, one over custom fields declared in the
//! subject store's field catalog. The custom variant needs a join
//! because custom values live outside the base subject row.

use async_trait::async_trait;
use roster_core::{
    subject::STANDARD_FIELDS, AliasAllocator, Bindings, ConfigMap, CustomFieldDef, EventKind,
    FieldDatatype, FieldError, FieldRef, Join, JoinSource, Predicate, QueryFragment, TextOp, Value,
};

use super::{Condition, ConditionContext};

/// Kind tag of the standard profile field condition.
pub const PROFILE_FIELD: &str = "profile_field";

/// Kind tag of the custom profile field condition.
pub const CUSTOM_PROFILE_FIELD: &str = "custom_profile_field";

const SUBSCRIBED: &[EventKind] = &[EventKind::SubjectCreated, EventKind::SubjectUpdated];

/// Display label for a standard field.
fn field_label(field: &str) -> String {
    match field {
        "username" => "Username",
        "email" => "Email address",
        "first_name" => "First name",
        "last_name" => "Last name",
        "id_number" => "ID number",
        "city" => "City",
        "country" => "Country",
        "institution" => "Institution",
        "department" => "Department",
        other => other,
    }
    .to_string()
}

/// Shared accessors over the `field` / `operator` / `value`
/// configuration shape both profile conditions use.
fn config_field(config: &ConfigMap) -> Option<&str> {
    config.get("field").and_then(Value::as_str)
}

fn config_operator(config: &ConfigMap) -> TextOp {
    config
        .get("operator")
        .and_then(Value::as_str)
        .and_then(TextOp::parse)
        .unwrap_or(TextOp::Equals)
}

fn config_value(config: &ConfigMap) -> &str {
    config.get("value").and_then(Value::as_str).unwrap_or("")
}

/// Validation shared by both profile conditions.
fn validate_common(config: &ConfigMap) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if config_field(config).is_none() {
        errors.push(FieldError::new("field", "Please select a field"));
    }

    if let Some(raw) = config.get("operator") {
        let known = raw.as_str().map(TextOp::parse);
        if !matches!(known, Some(Some(_))) {
            errors.push(FieldError::new("operator", "Unknown operator"));
        }
    }

    if config_value(config).is_empty() && !config_operator(config).is_emptiness() {
        errors.push(FieldError::new(
            "value",
            "A value is required for this operator",
        ));
    }

    errors
}

fn describe_common(label: String, op: TextOp, value: &str) -> String {
    if op.is_emptiness() {
        format!("{} {}", label, op.describe())
    } else {
        format!("{} {} '{}'", label, op.describe(), value)
    }
}

/// Condition over a standard profile field.
pub struct ProfileFieldCondition {
    config: ConfigMap,
}

impl ProfileFieldCondition {
    pub fn new(config: ConfigMap) -> Self {
        Self { config }
    }

    fn field(&self) -> Option<&str> {
        config_field(&self.config)
    }

    fn operator(&self) -> TextOp {
        config_operator(&self.config)
    }

    fn value(&self) -> &str {
        config_value(&self.config)
    }
}

#[async_trait]
impl Condition for ProfileFieldCondition {
    fn kind(&self) -> &str {
        PROFILE_FIELD
    }

    fn name(&self) -> String {
        "Standard profile field".to_string()
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = validate_common(&self.config);
        if let Some(field) = self.field() {
            if !STANDARD_FIELDS.contains(&field) {
                errors.push(FieldError::new(
                    "field",
                    format!("Unknown profile field: {field}"),
                ));
            }
        }
        errors
    }

    fn subscribed_events(&self) -> &'static [EventKind] {
        SUBSCRIBED
    }

    async fn is_broken(&self, _ctx: &ConditionContext<'_>) -> bool {
        if self.config.is_empty() {
            return false;
        }

        let field_ok = self
            .field()
            .is_some_and(|field| STANDARD_FIELDS.contains(&field));
        if !field_ok {
            return true;
        }

        self.value().is_empty() && !self.operator().is_emptiness()
    }

    async fn describe(&self, _ctx: &ConditionContext<'_>) -> String {
        let Some(field) = self.field() else {
            return String::new();
        };
        describe_common(field_label(field), self.operator(), self.value())
    }

    fn to_query_fragment(&self, aliases: &mut AliasAllocator) -> QueryFragment {
        let Some(field) = self.field() else {
            return QueryFragment::match_none();
        };
        if !STANDARD_FIELDS.contains(&field) {
            return QueryFragment::match_none();
        }

        let op = self.operator();
        let param = aliases.param();

        let mut bindings = Bindings::new();
        let bound = if op.is_emptiness() { "" } else { self.value() };
        bindings.insert(param.clone(), Value::from(bound));

        QueryFragment::predicate(
            Predicate::Compare {
                field: FieldRef::Standard(field.to_string()),
                op,
                param,
            },
            bindings,
        )
    }
}

/// Condition over a custom profile field from the catalog.
pub struct CustomProfileFieldCondition {
    config: ConfigMap,
}

impl CustomProfileFieldCondition {
    pub fn new(config: ConfigMap) -> Self {
        Self { config }
    }

    fn field(&self) -> Option<&str> {
        config_field(&self.config)
    }

    fn operator(&self) -> TextOp {
        config_operator(&self.config)
    }

    fn value(&self) -> &str {
        config_value(&self.config)
    }

    /// Catalog entry for the configured field, if it still exists.
    async fn catalog_entry(&self, ctx: &ConditionContext<'_>) -> Option<CustomFieldDef> {
        let shortname = self.field()?;
        ctx.subjects
            .custom_fields()
            .await
            .ok()?
            .into_iter()
            .find(|def| def.shortname == shortname)
    }
}

#[async_trait]
impl Condition for CustomProfileFieldCondition {
    fn kind(&self) -> &str {
        CUSTOM_PROFILE_FIELD
    }

    fn name(&self) -> String {
        "Custom profile field".to_string()
    }

    fn validate(&self) -> Vec<FieldError> {
        validate_common(&self.config)
    }

    fn subscribed_events(&self) -> &'static [EventKind] {
        SUBSCRIBED
    }

    async fn is_broken(&self, ctx: &ConditionContext<'_>) -> bool {
        if self.config.is_empty() {
            return false;
        }

        if self.field().is_none() {
            return true;
        }

        let op = self.operator();
        if self.value().is_empty() && !op.is_emptiness() {
            return true;
        }

        // The field must still be declared, and the operator and value
        // must fit its datatype.
        match self.catalog_entry(ctx).await {
            None => true,
            Some(def) => match def.datatype {
                FieldDatatype::Text => false,
                FieldDatatype::Menu(options) => {
                    !op.supports_menu() || !options.iter().any(|option| option == self.value())
                }
            },
        }
    }

    async fn describe(&self, ctx: &ConditionContext<'_>) -> String {
        let Some(shortname) = self.field() else {
            return String::new();
        };

        let label = self
            .catalog_entry(ctx)
            .await
            .map(|def| def.name)
            .unwrap_or_else(|| shortname.to_string());

        describe_common(label, self.operator(), self.value())
    }

    fn to_query_fragment(&self, aliases: &mut AliasAllocator) -> QueryFragment {
        let Some(shortname) = self.field() else {
            return QueryFragment::match_none();
        };

        let op = self.operator();
        let field_param = aliases.param();
        let alias = aliases.table();
        let value_param = aliases.param();

        let mut bindings = Bindings::new();
        bindings.insert(field_param.clone(), Value::from(shortname));
        let bound = if op.is_emptiness() { "" } else { self.value() };
        bindings.insert(value_param.clone(), Value::from(bound));

        QueryFragment {
            join: Some(Join {
                alias: alias.clone(),
                source: JoinSource::CustomField { field_param },
            }),
            predicate: Some(Predicate::Compare {
                field: FieldRef::Joined { alias },
                op,
                param: value_param,
            }),
            bindings,
        }
    }
}
