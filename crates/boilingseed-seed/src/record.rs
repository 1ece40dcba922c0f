use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use boilingseed_core::ColumnType;

/// A single column value in a candidate or stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Decode a JSON scalar produced by the database (`to_jsonb(row)`) using the column type.
    pub fn from_json(value: &serde_json::Value, column_type: &ColumnType) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(value) => Value::Bool(*value),
            Json::Number(number) => match number.as_i64() {
                Some(int) if column_type.numeric_scale.unwrap_or(0) == 0 => Value::Int(int),
                _ => number.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(text) => match column_type.base_name().as_str() {
                "uuid" => Uuid::parse_str(text)
                    .map(Value::Uuid)
                    .unwrap_or_else(|_| Value::Text(text.clone())),
                "date" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map(Value::Date)
                    .unwrap_or_else(|_| Value::Text(text.clone())),
                "time without time zone" | "time" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                    .map(Value::Time)
                    .unwrap_or_else(|_| Value::Text(text.clone())),
                "timestamp without time zone" | "timestamp" => {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                        .map(Value::Timestamp)
                        .unwrap_or_else(|_| Value::Text(text.clone()))
                }
                "timestamp with time zone" => chrono::DateTime::parse_from_rfc3339(text)
                    .map(|value| Value::Timestamp(value.naive_utc()))
                    .unwrap_or_else(|_| Value::Text(text.clone())),
                "numeric" => text
                    .parse::<f64>()
                    .map(Value::Float)
                    .unwrap_or_else(|_| Value::Text(text.clone())),
                _ => Value::Text(text.clone()),
            },
            other => Value::Json(other.clone()),
        }
    }

    /// Stable textual key, used to compare values across rows.
    pub fn key(&self) -> String {
        match self {
            Value::Null => "<null>".to_string(),
            Value::Float(value) => format!("{value:?}"),
            Value::Json(value) => value.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Uuid(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
            Value::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S")),
            Value::Json(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// A candidate or stored row keyed by column name.
///
/// A column that is absent is unset and may be filled by the foreign-key
/// resolver or the database; a column holding [`Value::Null`] was set
/// explicitly and is left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn is_set(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of `columns` in order, or `None` if any is missing or null.
    pub fn project(&self, columns: &[String]) -> Option<Vec<&Value>> {
        columns
            .iter()
            .map(|column| self.values.get(column).filter(|value| !value.is_null()))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_null_counts_as_set() {
        let record = Record::new().with("bio", Value::Null);
        assert!(record.is_set("bio"));
        assert!(!record.is_set("name"));
        assert_eq!(record.project(&["bio".to_string()]), None);
    }

    #[test]
    fn decodes_database_json_by_column_type() {
        let int = ColumnType::named("integer");
        assert_eq!(Value::from_json(&serde_json::json!(7), &int), Value::Int(7));

        let date = ColumnType::named("date");
        assert_eq!(
            Value::from_json(&serde_json::json!("2024-02-29"), &date),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date"))
        );

        let mut numeric = ColumnType::named("numeric");
        numeric.numeric_scale = Some(2);
        assert_eq!(
            Value::from_json(&serde_json::json!(12.5), &numeric),
            Value::Float(12.5)
        );
    }
}
