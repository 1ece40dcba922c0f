use serde::{Deserialize, Serialize};

/// Formatted and raw type metadata for a column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnType {
    /// User-friendly formatted type (e.g. `character varying(255)`).
    pub data_type: String,
    /// Namespace of the underlying type.
    #[serde(default)]
    pub udt_schema: String,
    /// Name of the underlying type.
    #[serde(default)]
    pub udt_name: String,
    #[serde(default)]
    pub character_max_length: Option<i32>,
    #[serde(default)]
    pub numeric_precision: Option<i32>,
    #[serde(default)]
    pub numeric_scale: Option<i32>,
}

impl ColumnType {
    /// Shorthand for a builtin type with no modifiers.
    pub fn named(data_type: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: data_type.to_string(),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    /// Base type name without modifiers, lowercased (`character varying(20)` -> `character varying`).
    pub fn base_name(&self) -> String {
        self.data_type
            .split('(')
            .next()
            .unwrap_or(&self.data_type)
            .trim()
            .to_lowercase()
    }

    pub fn is_user_defined(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("USER-DEFINED")
    }
}

/// Identity generation strategy for columns using `GENERATED ... AS IDENTITY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    Always,
    ByDefault,
}

/// Kind of generated column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKind {
    Stored,
}

/// Information about generated column expressions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedExpression {
    pub kind: GeneratedKind,
    pub expression: Option<String>,
}

/// Enum type with its labels in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
}
