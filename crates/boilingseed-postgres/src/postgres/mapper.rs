use std::collections::BTreeMap;

use sqlx::error::ErrorKind;
use sqlx::postgres::PgDatabaseError;

use boilingseed_core::ColumnType;
use boilingseed_seed::{PersistError, Record, Value};

/// Decode a `to_jsonb(row)` object into a record, typing values by column.
pub fn map_row(
    row: serde_json::Value,
    columns: &BTreeMap<String, ColumnType>,
) -> Result<Record, PersistError> {
    let fields = match row {
        serde_json::Value::Object(fields) => fields,
        other => {
            return Err(PersistError::database(format!(
                "expected a JSON object row, got {other}"
            )));
        }
    };

    let untyped = ColumnType::named("text");
    Ok(fields
        .into_iter()
        .map(|(name, value)| {
            let column_type = columns.get(&name).unwrap_or(&untyped);
            let decoded = Value::from_json(&value, column_type);
            (name, decoded)
        })
        .collect())
}

/// Classify a driver error by SQLSTATE. Only unique violations become retryable.
pub fn map_error(err: sqlx::Error) -> PersistError {
    classify(&err).unwrap_or_else(|| PersistError::database(err))
}

fn classify(err: &sqlx::Error) -> Option<PersistError> {
    let sqlx::Error::Database(db) = err else {
        return None;
    };

    let constraint = db.constraint().map(str::to_string);
    let message = db.message().to_string();
    let mapped = match db.kind() {
        ErrorKind::UniqueViolation => PersistError::UniqueViolation {
            constraint,
            message,
        },
        ErrorKind::ForeignKeyViolation => PersistError::ForeignKeyViolation {
            constraint,
            message,
        },
        ErrorKind::NotNullViolation => PersistError::NotNullViolation {
            column: db
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(PgDatabaseError::column)
                .unwrap_or("<unknown>")
                .to_string(),
        },
        _ => return None,
    };
    Some(mapped)
}
