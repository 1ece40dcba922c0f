use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use boilingseed_core::{DatabaseSchema, Table, table_key, validate_schema};

use crate::config::DEFAULT_RETRY_BUDGET;
use crate::errors::SeedError;

/// Qualified `schema.table` identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityName(String);

impl EntityName {
    pub fn new(schema: &str, table: &str) -> Self {
        Self(table_key(schema, table))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table part of the qualified name.
    pub fn table(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(_, table)| table)
    }

    pub fn schema(&self) -> &str {
        self.0.split_once('.').map_or("", |(schema, _)| schema)
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One foreign key of an entity: `columns[i]` must match `referenced_columns[i]` of a row in `referenced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub name: Option<String>,
    pub referenced: EntityName,
    pub columns: Vec<String>,
    pub referenced_columns: Vec<String>,
}

/// Static seeding metadata for one entity. Immutable once a [`Seeder`](crate::Seeder) is built.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub name: EntityName,
    pub table: Table,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub minimum_count: u64,
    pub retry_budget: u32,
}

impl EntityDescriptor {
    fn from_table(schema: &str, table: &Table) -> Self {
        let foreign_keys = table
            .foreign_keys()
            .map(|fk| ForeignKeyRef {
                name: fk.name.clone(),
                referenced: EntityName::new(&fk.referenced_schema, &fk.referenced_table),
                columns: fk.columns.clone(),
                referenced_columns: fk.referenced_columns.clone(),
            })
            .collect();

        Self {
            name: EntityName::new(schema, &table.name),
            table: table.clone(),
            foreign_keys,
            minimum_count: 0,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    /// Every column that participates in a foreign key.
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .flat_map(|fk| fk.columns.iter().map(String::as_str))
    }
}

/// Descriptors for every seedable table in a schema, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    entities: BTreeMap<EntityName, EntityDescriptor>,
}

impl DescriptorSet {
    /// Build descriptors for base tables. Views and other relations are never seeded.
    pub fn from_schema(schema: &DatabaseSchema) -> Result<Self, SeedError> {
        validate_schema(schema).map_err(|err| SeedError::InvalidSchema(err.to_string()))?;

        let entities = schema
            .tables()
            .filter(|(_, table)| table.is_seedable())
            .map(|(schema_name, table)| {
                let descriptor = EntityDescriptor::from_table(schema_name, table);
                (descriptor.name.clone(), descriptor)
            })
            .collect();

        Ok(Self { entities })
    }

    pub fn get(&self, entity: &EntityName) -> Option<&EntityDescriptor> {
        self.entities.get(entity)
    }

    pub(crate) fn get_mut(&mut self, entity: &EntityName) -> Option<&mut EntityDescriptor> {
        self.entities.get_mut(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Resolve a configuration key to an entity.
    ///
    /// Accepts the qualified `schema.table` form or a bare table name, which
    /// must match exactly one entity.
    pub fn resolve(&self, key: &str) -> Result<EntityName, SeedError> {
        if let Some(descriptor) = self.entities.values().find(|d| d.name.as_str() == key) {
            return Ok(descriptor.name.clone());
        }

        let mut matches = self.entities.keys().filter(|name| name.table() == key);
        match (matches.next(), matches.next()) {
            (Some(name), None) => Ok(name.clone()),
            (Some(first), Some(second)) => Err(SeedError::InvalidConfig(format!(
                "entity '{key}' is ambiguous ({first}, {second}, ...); use schema.table"
            ))),
            (None, _) => Err(SeedError::InvalidConfig(format!(
                "unknown entity '{key}'"
            ))),
        }
    }
}
