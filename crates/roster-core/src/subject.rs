//! Subject (population member) definitions

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::SubjectId;

/// Standard profile fields every subject carries.
pub const STANDARD_FIELDS: &[&str] = &[
    "username",
    "email",
    "first_name",
    "last_name",
    "id_number",
    "city",
    "country",
    "institution",
    "department",
];

/// Datatype of a custom profile field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDatatype {
    /// Free text, compared with the full text operator set.
    Text,
    /// A closed list of options, compared with equality only.
    Menu(Vec<String>),
}

/// Definition of a custom profile field, declared in the subject
/// store's field catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    /// Machine name, referenced by condition configuration.
    pub shortname: String,
    /// Display name.
    pub name: String,
    /// Datatype, constrains admissible operators.
    pub datatype: FieldDatatype,
}

/// A member of the subject population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Identifier.
    pub id: SubjectId,

    /// Soft-deletion flag; deleted subjects never match any rule.
    pub deleted: bool,

    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub city: String,
    pub country: String,
    pub institution: String,
    pub department: String,

    /// Custom field values keyed by field shortname.
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

impl Subject {
    /// Create a subject with the given username and empty remaining
    /// fields.
    pub fn new(id: SubjectId, username: impl Into<String>) -> Self {
        Self {
            id,
            deleted: false,
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            id_number: String::new(),
            city: String::new(),
            country: String::new(),
            institution: String::new(),
            department: String::new(),
            custom: HashMap::new(),
        }
    }

    /// Look up a standard profile field by name.
    pub fn standard_field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "username" => &self.username,
            "email" => &self.email,
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "id_number" => &self.id_number,
            "city" => &self.city,
            "country" => &self.country,
            "institution" => &self.institution,
            "department" => &self.department,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Look up a custom field value by shortname.
    pub fn custom_field(&self, shortname: &str) -> Option<&str> {
        self.custom.get(shortname).map(String::as_str)
    }
}
