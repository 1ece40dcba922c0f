use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, ForeignKey};
use crate::error::{Error, Result};
use crate::types::{ColumnType, EnumType, GeneratedExpression, IdentityGeneration};

/// Top-level schema snapshot for a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Contract version for this schema format.
    pub schema_version: String,
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    #[serde(default)]
    pub database: Option<String>,
    pub schemas: Vec<Schema>,
    #[serde(default)]
    pub enums: Vec<EnumType>,
}

impl DatabaseSchema {
    /// Parse a `schema.json` snapshot, rejecting other contract versions.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let schema: DatabaseSchema = serde_json::from_str(input)?;
        if schema.schema_version != crate::SCHEMA_VERSION {
            return Err(Error::UnsupportedVersion {
                found: schema.schema_version,
                expected: crate::SCHEMA_VERSION.to_string(),
            });
        }
        Ok(schema)
    }

    /// Iterate every table together with its namespace.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.schemas.iter().flat_map(|db_schema| {
            db_schema
                .tables
                .iter()
                .map(move |table| (db_schema.name.as_str(), table))
        })
    }

    /// Find a table by its qualified key.
    pub fn table(&self, key: &str) -> Option<(&str, &Table)> {
        self.tables()
            .find(|(schema, table)| table_key(schema, &table.name) == key)
    }

    /// Labels of the enum type backing a user-defined column, if any.
    pub fn enum_labels(&self, column_type: &ColumnType) -> Option<&[String]> {
        self.enums
            .iter()
            .find(|item| item.schema == column_type.udt_schema && item.name == column_type.udt_name)
            .map(|item| item.labels.as_slice())
    }
}

/// A namespace containing tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

/// A table-like object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Table {
    /// Only base tables hold rows the seeder can insert.
    pub fn is_seedable(&self) -> bool {
        matches!(self.kind, TableKind::Table | TableKind::PartitionedTable)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::PrimaryKey(pk) => Some(pk.columns.as_slice()),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }

    /// Column sets that must be unique: the primary key followed by unique constraints.
    pub fn unique_column_sets(&self) -> Vec<&[String]> {
        let mut sets = Vec::new();
        if let Some(pk) = self.primary_key() {
            sets.push(pk);
        }
        for constraint in &self.constraints {
            if let Constraint::Unique(unique) = constraint {
                sets.push(unique.columns.as_slice());
            }
        }
        sets
    }
}

/// Kind of table represented in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    ForeignTable,
    Other(String),
}

/// Column metadata for a table-like object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub ordinal_position: i16,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityGeneration>,
    #[serde(default)]
    pub generated: Option<GeneratedExpression>,
}

impl Column {
    /// True when the database fills the value itself (identity, serial, defaults, generated).
    pub fn is_database_filled(&self) -> bool {
        self.identity.is_some() || self.generated.is_some() || self.default.is_some()
    }

    /// True for identity columns and `nextval(...)` serial defaults.
    pub fn is_auto_increment(&self) -> bool {
        self.identity.is_some()
            || self
                .default
                .as_deref()
                .is_some_and(|default| default.trim_start().starts_with("nextval("))
    }
}

/// Qualified `schema.table` key used across the workspace.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{schema}.{table}")
}
