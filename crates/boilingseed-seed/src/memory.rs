//! In-memory [`Repository`] used for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use boilingseed_core::{Column, Constraint, DatabaseSchema};

use crate::descriptor::{EntityName, ForeignKeyRef};
use crate::errors::PersistError;
use crate::record::{Record, Value};
use crate::repository::Repository;

/// Repository calls made so far, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub count: u64,
    pub insert: u64,
    pub list_existing: u64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.count + self.insert + self.list_existing
    }
}

#[derive(Debug, Clone)]
struct UniqueSet {
    name: Option<String>,
    columns: Vec<String>,
}

#[derive(Debug, Clone)]
struct TableSpec {
    columns: Vec<Column>,
    unique_sets: Vec<UniqueSet>,
    foreign_keys: Vec<ForeignKeyRef>,
}

impl TableSpec {
    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<EntityName, Vec<Record>>,
    sequences: BTreeMap<(EntityName, String), i64>,
    calls: CallCounts,
}

/// Table store that enforces the constraints a database would.
///
/// Identity and serial columns get sequence values, primary-key and unique
/// constraints report [`PersistError::UniqueViolation`], foreign keys report
/// [`PersistError::ForeignKeyViolation`]. Defaults other than sequences are
/// not evaluated; such columns are stored as null when left unset.
#[derive(Debug)]
pub struct InMemoryRepository {
    tables: BTreeMap<EntityName, TableSpec>,
    state: Mutex<State>,
}

impl InMemoryRepository {
    /// Empty store with one table per base table of `schema`.
    pub fn from_schema(schema: &DatabaseSchema) -> Self {
        let mut tables = BTreeMap::new();
        let mut rows = BTreeMap::new();

        for (schema_name, table) in schema.tables().filter(|(_, table)| table.is_seedable()) {
            let mut unique_sets = Vec::new();
            let mut foreign_keys = Vec::new();
            for constraint in &table.constraints {
                match constraint {
                    Constraint::PrimaryKey(pk) => unique_sets.push(UniqueSet {
                        name: pk.name.clone(),
                        columns: pk.columns.clone(),
                    }),
                    Constraint::Unique(unique) => unique_sets.push(UniqueSet {
                        name: unique.name.clone(),
                        columns: unique.columns.clone(),
                    }),
                    Constraint::ForeignKey(fk) => foreign_keys.push(ForeignKeyRef {
                        name: fk.name.clone(),
                        referenced: EntityName::new(&fk.referenced_schema, &fk.referenced_table),
                        columns: fk.columns.clone(),
                        referenced_columns: fk.referenced_columns.clone(),
                    }),
                    Constraint::Check(_) => {}
                }
            }

            let name = EntityName::new(schema_name, &table.name);
            rows.insert(name.clone(), Vec::new());
            tables.insert(
                name,
                TableSpec {
                    columns: table.columns.clone(),
                    unique_sets,
                    foreign_keys,
                },
            );
        }

        Self {
            tables,
            state: Mutex::new(State {
                rows,
                ..State::default()
            }),
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.state().map(|state| state.calls).unwrap_or_default()
    }

    /// Stored rows of `entity` in insertion order.
    pub fn rows(&self, entity: &EntityName) -> Vec<Record> {
        self.state()
            .ok()
            .and_then(|state| state.rows.get(entity).cloned())
            .unwrap_or_default()
    }

    pub fn row_count(&self, entity: &EntityName) -> usize {
        self.state()
            .ok()
            .and_then(|state| state.rows.get(entity).map(Vec::len))
            .unwrap_or(0)
    }

    /// Store rows with full constraint checks, without counting them as repository calls.
    pub fn preload(
        &self,
        entity: &EntityName,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<Record>, PersistError> {
        let mut state = self.state()?;
        records
            .into_iter()
            .map(|record| self.insert_locked(&mut state, entity, &record))
            .collect()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, PersistError> {
        self.state
            .lock()
            .map_err(|_| PersistError::database("in-memory repository lock poisoned"))
    }

    fn spec(&self, entity: &EntityName) -> Result<&TableSpec, PersistError> {
        self.tables
            .get(entity)
            .ok_or_else(|| PersistError::UnknownEntity(entity.to_string()))
    }

    fn insert_locked(
        &self,
        state: &mut State,
        entity: &EntityName,
        record: &Record,
    ) -> Result<Record, PersistError> {
        let spec = self.spec(entity)?;

        if let Some(column) = record.columns().find(|column| spec.column(column).is_none()) {
            return Err(PersistError::UnknownColumn {
                entity: entity.to_string(),
                column: column.to_string(),
            });
        }

        let mut stored = record.clone();
        for column in &spec.columns {
            if stored.is_set(&column.name) {
                continue;
            }
            if column.is_auto_increment() {
                let next = state
                    .sequences
                    .entry((entity.clone(), column.name.clone()))
                    .or_insert(0);
                *next += 1;
                stored.set(column.name.clone(), Value::Int(*next));
            } else {
                stored.set(column.name.clone(), Value::Null);
            }
        }

        for column in &spec.columns {
            let missing = stored.get(&column.name).is_none_or(Value::is_null);
            if missing && !column.is_nullable && !column.is_database_filled() {
                return Err(PersistError::NotNullViolation {
                    column: column.name.clone(),
                });
            }
        }

        let existing = state.rows.get(entity).map(Vec::as_slice).unwrap_or_default();
        for unique in &spec.unique_sets {
            let Some(key) = stored.project(&unique.columns) else {
                continue;
            };
            let key = keys(&key);
            if existing
                .iter()
                .filter_map(|row| row.project(&unique.columns))
                .any(|other| keys(&other) == key)
            {
                return Err(PersistError::UniqueViolation {
                    constraint: unique.name.clone(),
                    message: format!(
                        "duplicate key value ({})=({}) in {entity}",
                        unique.columns.join(", "),
                        key.join(", ")
                    ),
                });
            }
        }

        for fk in &spec.foreign_keys {
            let Some(key) = stored.project(&fk.columns) else {
                continue;
            };
            let key = keys(&key);
            let found = state.rows.get(&fk.referenced).is_some_and(|rows| {
                rows.iter()
                    .filter_map(|row| row.project(&fk.referenced_columns))
                    .any(|other| keys(&other) == key)
            });
            if !found {
                return Err(PersistError::ForeignKeyViolation {
                    constraint: fk.name.clone(),
                    message: format!(
                        "key ({})=({}) is not present in {}",
                        fk.columns.join(", "),
                        key.join(", "),
                        fk.referenced
                    ),
                });
            }
        }

        state
            .rows
            .entry(entity.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}

fn keys(values: &[&Value]) -> Vec<String> {
    values.iter().map(|value| value.key()).collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn count(&self, entity: &EntityName) -> Result<u64, PersistError> {
        let mut state = self.state()?;
        state.calls.count += 1;
        state
            .rows
            .get(entity)
            .map(|rows| rows.len() as u64)
            .ok_or_else(|| PersistError::UnknownEntity(entity.to_string()))
    }

    async fn insert(&self, entity: &EntityName, record: &Record) -> Result<Record, PersistError> {
        let mut state = self.state()?;
        state.calls.insert += 1;
        self.insert_locked(&mut state, entity, record)
    }

    async fn list_existing(
        &self,
        entity: &EntityName,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, PersistError> {
        let mut state = self.state()?;
        state.calls.list_existing += 1;
        let rows = state
            .rows
            .get(entity)
            .ok_or_else(|| PersistError::UnknownEntity(entity.to_string()))?;
        let limit = limit.map_or(rows.len(), |limit| {
            usize::try_from(limit).unwrap_or(usize::MAX)
        });
        Ok(rows.iter().take(limit).cloned().collect())
    }
}
