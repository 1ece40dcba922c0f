use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::trace;

use boilingseed_core::{ColumnType, DatabaseSchema};
use boilingseed_seed::{EntityName, PersistError, Record, Repository, Value};

mod mapper;
mod queries;

#[derive(Debug, Clone)]
struct TableInfo {
    qualified: String,
    columns: BTreeMap<String, ColumnType>,
}

/// [`Repository`] over a caller-owned PostgreSQL pool.
///
/// Every statement runs on its own; rows already inserted stay committed
/// when a later insert fails.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    tables: BTreeMap<EntityName, TableInfo>,
}

impl PostgresRepository {
    /// Repository for the base tables of `schema` using a pre-configured pool.
    pub fn new(pool: PgPool, schema: &DatabaseSchema) -> Self {
        let tables = schema
            .tables()
            .filter(|(_, table)| table.is_seedable())
            .map(|(schema_name, table)| {
                let info = TableInfo {
                    qualified: queries::qualified_table(schema_name, &table.name),
                    columns: table
                        .columns
                        .iter()
                        .map(|column| (column.name.clone(), column.column_type.clone()))
                        .collect(),
                };
                (EntityName::new(schema_name, &table.name), info)
            })
            .collect();

        Self { pool, tables }
    }

    fn table(&self, entity: &EntityName) -> Result<&TableInfo, PersistError> {
        self.tables
            .get(entity)
            .ok_or_else(|| PersistError::UnknownEntity(entity.to_string()))
    }

    fn decode(&self, table: &TableInfo, row: &PgRow) -> Result<Record, PersistError> {
        let json: serde_json::Value = row.try_get(0).map_err(mapper::map_error)?;
        mapper::map_row(json, &table.columns)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn count(&self, entity: &EntityName) -> Result<u64, PersistError> {
        let table = self.table(entity)?;
        let count = sqlx::query_scalar::<_, i64>(&queries::count_sql(&table.qualified))
            .fetch_one(&self.pool)
            .await
            .map_err(mapper::map_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert(&self, entity: &EntityName, record: &Record) -> Result<Record, PersistError> {
        let table = self.table(entity)?;

        let mut columns = Vec::with_capacity(record.len());
        for (name, _) in record.iter() {
            let column_type =
                table
                    .columns
                    .get(name)
                    .ok_or_else(|| PersistError::UnknownColumn {
                        entity: entity.to_string(),
                        column: name.to_string(),
                    })?;
            columns.push((name, column_type));
        }

        let sql = queries::insert_sql(&table.qualified, &columns);
        trace!(entity = %entity, sql = %sql, "insert");

        let mut query = sqlx::query(&sql);
        for (_, value) in record.iter() {
            query = bind_value(query, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(mapper::map_error)?;
        self.decode(table, &row)
    }

    async fn list_existing(
        &self,
        entity: &EntityName,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, PersistError> {
        let table = self.table(entity)?;
        let sql = queries::list_sql(&table.qualified, limit.is_some());

        let mut query = sqlx::query(&sql);
        if let Some(limit) = limit {
            query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(mapper::map_error)?;

        rows.iter().map(|row| self.decode(table, row)).collect()
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(value) => query.bind(*value),
        Value::Int(value) => query.bind(*value),
        Value::Float(value) => query.bind(*value),
        Value::Text(value) => query.bind(value.clone()),
        Value::Uuid(value) => query.bind(*value),
        Value::Date(value) => query.bind(*value),
        Value::Time(value) => query.bind(*value),
        Value::Timestamp(value) => query.bind(*value),
        Value::Json(value) => query.bind(sqlx::types::Json(value.clone())),
    }
}
