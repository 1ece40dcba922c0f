use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::{Rng, RngCore};

use boilingseed_core::{Column, DatabaseSchema};

use crate::descriptor::{EntityDescriptor, EntityName};
use crate::errors::GeneratorError;
use crate::generators::Generator;
use crate::record::{Record, Value};

const DATE_SPAN_DAYS: i64 = 5 * 365;
const DEFAULT_INT_MAX: i64 = 100_000;
const DEFAULT_FLOAT_MAX: f64 = 10_000.0;
const UNBOUNDED_FLOAT_MAX: f64 = 1_000_000_000.0;

/// Default generator: one plausible value per insertable column, chosen by type and name.
///
/// Columns the database fills (identity, serial, defaults, generated) and
/// foreign-key columns are left unset.
#[derive(Debug, Clone)]
pub struct ColumnGenerator {
    entity: EntityName,
    columns: Vec<ColumnPlan>,
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    name: String,
    kind: ColumnKind,
    unique: bool,
    nullable: bool,
    max_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnKind {
    Int { max: i64 },
    Numeric { max: f64, scale: Option<i32> },
    Bool,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
    Text(TextHint),
    Enum(Vec<String>),
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextHint {
    Email,
    FullName,
    FirstName,
    LastName,
    Title,
    City,
    Country,
    Phone,
    Url,
    Isbn,
    Paragraph,
    Plain,
}

impl ColumnGenerator {
    pub fn new(schema: &DatabaseSchema, descriptor: &EntityDescriptor) -> Self {
        let table = &descriptor.table;
        let fk_columns: Vec<&str> = descriptor.foreign_key_columns().collect();
        let unique_sets = table.unique_column_sets();

        let mut columns: Vec<&Column> = table
            .columns
            .iter()
            .filter(|column| !column.is_database_filled())
            .filter(|column| !fk_columns.contains(&column.name.as_str()))
            .collect();
        columns.sort_by_key(|column| column.ordinal_position);

        let columns = columns
            .into_iter()
            .map(|column| ColumnPlan {
                name: column.name.clone(),
                kind: classify(schema, column),
                unique: unique_sets
                    .iter()
                    .any(|set| set.iter().any(|name| name == &column.name)),
                nullable: column.is_nullable,
                max_len: column
                    .column_type
                    .character_max_length
                    .and_then(|len| usize::try_from(len).ok()),
            })
            .collect();

        Self {
            entity: descriptor.name.clone(),
            columns,
        }
    }

    /// Names of the columns this generator sets, in ordinal order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|plan| plan.name.as_str())
    }
}

impl Generator for ColumnGenerator {
    fn generate(&self, rng: &mut dyn RngCore) -> Result<Record, GeneratorError> {
        let mut record = Record::new();
        for plan in &self.columns {
            match generate_value(plan, rng) {
                Some(value) => record.set(plan.name.clone(), value),
                None if plan.nullable => {}
                None => {
                    let ColumnKind::Unsupported(data_type) = &plan.kind else {
                        return Err(GeneratorError::Invalid(format!(
                            "{}: no value for '{}'",
                            self.entity, plan.name
                        )));
                    };
                    return Err(GeneratorError::UnsupportedType {
                        column: format!("{}.{}", self.entity, plan.name),
                        data_type: data_type.clone(),
                    });
                }
            }
        }
        Ok(record)
    }
}

fn classify(schema: &DatabaseSchema, column: &Column) -> ColumnKind {
    let column_type = &column.column_type;
    if column_type.is_user_defined() {
        return match schema.enum_labels(column_type) {
            Some(labels) if !labels.is_empty() => ColumnKind::Enum(labels.to_vec()),
            _ => ColumnKind::Unsupported(format!(
                "{}.{}",
                column_type.udt_schema, column_type.udt_name
            )),
        };
    }

    match column_type.base_name().as_str() {
        "smallint" => ColumnKind::Int {
            max: i64::from(i16::MAX),
        },
        "integer" => ColumnKind::Int {
            max: i64::from(i32::MAX),
        },
        "bigint" => ColumnKind::Int { max: i64::MAX },
        "numeric" | "decimal" => {
            let scale = column_type.numeric_scale;
            let int_digits = column_type
                .numeric_precision
                .map(|precision| precision - scale.unwrap_or(0));
            // numeric(p, s) holds magnitudes below 10^(p - s), in steps of 10^-s.
            let max = match int_digits {
                Some(digits) => {
                    let step = 10f64.powi(-scale.unwrap_or(0).max(0));
                    (10f64.powi(digits) - step).max(0.0)
                }
                None => UNBOUNDED_FLOAT_MAX,
            };
            ColumnKind::Numeric { max, scale }
        }
        "real" | "double precision" => ColumnKind::Numeric {
            max: UNBOUNDED_FLOAT_MAX,
            scale: None,
        },
        "boolean" => ColumnKind::Bool,
        "date" => ColumnKind::Date,
        "time without time zone" | "time with time zone" => ColumnKind::Time,
        "timestamp without time zone" | "timestamp with time zone" => ColumnKind::Timestamp,
        "uuid" => ColumnKind::Uuid,
        "json" | "jsonb" => ColumnKind::Json,
        "text" | "character varying" | "character" | "varchar" | "char" | "citext" => {
            ColumnKind::Text(text_hint(&column.name))
        }
        other => ColumnKind::Unsupported(other.to_string()),
    }
}

fn text_hint(column: &str) -> TextHint {
    let name = column.to_lowercase();
    match name.as_str() {
        "first_name" | "firstname" | "given_name" => TextHint::FirstName,
        "last_name" | "lastname" | "surname" | "family_name" => TextHint::LastName,
        "name" | "full_name" | "author" | "username" => TextHint::FullName,
        "title" | "headline" | "subject" => TextHint::Title,
        "city" => TextHint::City,
        "country" => TextHint::Country,
        "isbn" => TextHint::Isbn,
        "bio" | "description" | "summary" | "body" | "content" | "notes" => TextHint::Paragraph,
        _ if name.contains("email") => TextHint::Email,
        _ if name.contains("phone") => TextHint::Phone,
        _ if name.contains("url") || name.contains("website") => TextHint::Url,
        _ => TextHint::Plain,
    }
}

fn generate_value(plan: &ColumnPlan, rng: &mut dyn RngCore) -> Option<Value> {
    let value = match &plan.kind {
        ColumnKind::Int { max } => {
            let upper = if plan.unique { *max } else { (*max).min(DEFAULT_INT_MAX) };
            Value::Int(rng.random_range(1..=upper))
        }
        ColumnKind::Numeric { max, scale } => {
            let upper = if plan.unique { *max } else { max.min(DEFAULT_FLOAT_MAX) };
            let raw = if upper > 0.0 { rng.random_range(0.0..=upper) } else { 0.0 };
            match scale {
                Some(scale) if *scale >= 0 => {
                    let factor = 10f64.powi(*scale);
                    Value::Float((raw * factor).floor() / factor)
                }
                _ => Value::Float(raw),
            }
        }
        ColumnKind::Bool => Value::Bool(rng.random_bool(0.5)),
        ColumnKind::Date => Value::Date(random_date(rng)),
        ColumnKind::Time => Value::Time(random_time(rng)),
        ColumnKind::Timestamp => Value::Timestamp(NaiveDateTime::new(random_date(rng), random_time(rng))),
        ColumnKind::Uuid => Value::Uuid(uuid::Uuid::from_bytes(rng.random::<[u8; 16]>())),
        ColumnKind::Json => Value::Json(serde_json::json!({ "seed": rng.random::<u32>() })),
        ColumnKind::Enum(labels) => Value::Text(labels[rng.random_range(0..labels.len())].clone()),
        ColumnKind::Text(hint) => Value::Text(random_text(plan, *hint, rng)),
        ColumnKind::Unsupported(_) => return None,
    };
    Some(value)
}

fn random_date(rng: &mut dyn RngCore) -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    base + Duration::days(rng.random_range(0..=DATE_SPAN_DAYS))
}

fn random_time(rng: &mut dyn RngCore) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(rng.random_range(0..86_400), 0)
        .unwrap_or_default()
}

fn random_text(plan: &ColumnPlan, hint: TextHint, rng: &mut dyn RngCore) -> String {
    let base: String = match hint {
        TextHint::Email if plan.unique => return unique_email(plan.max_len, rng),
        TextHint::Email => SafeEmail().fake_with_rng(rng),
        TextHint::FullName => Name().fake_with_rng(rng),
        TextHint::FirstName => FirstName().fake_with_rng(rng),
        TextHint::LastName => LastName().fake_with_rng(rng),
        TextHint::Title => {
            let words: Vec<String> = Words(2..5).fake_with_rng(rng);
            capitalize(&words.join(" "))
        }
        TextHint::City => CityName().fake_with_rng(rng),
        TextHint::Country => CountryName().fake_with_rng(rng),
        TextHint::Phone => PhoneNumber().fake_with_rng(rng),
        TextHint::Url => {
            let word: String = Word().fake_with_rng(rng);
            format!("https://{word}.example.com")
        }
        TextHint::Isbn => {
            return fit(
                format!("978{:010}", rng.random_range(0..10_000_000_000_u64)),
                plan.max_len,
            );
        }
        TextHint::Paragraph => Sentence(5..12).fake_with_rng(rng),
        TextHint::Plain if plan.unique => {
            return unique_suffix(&plan.name, '_', plan.max_len, rng);
        }
        TextHint::Plain => format!("{}_{}", plan.name, rng.random::<u32>()),
    };

    if plan.unique {
        unique_suffix(&base, ' ', plan.max_len, rng)
    } else {
        fit(base, plan.max_len)
    }
}

/// Append a random hex tag, trimming the base first so the tag survives `max_len`.
fn unique_suffix(
    base: &str,
    separator: char,
    max_len: Option<usize>,
    rng: &mut dyn RngCore,
) -> String {
    let tag = format!("{separator}{:08x}", rng.random::<u32>());
    match max_len {
        Some(max_len) if max_len > tag.len() => {
            let keep = max_len - tag.len();
            format!("{}{tag}", base.chars().take(keep).collect::<String>())
        }
        Some(max_len) => tag[separator.len_utf8()..].chars().take(max_len).collect(),
        None => format!("{base}{tag}"),
    }
}

/// Tag the local part so the address stays well-formed; only the local part is trimmed.
fn unique_email(max_len: Option<usize>, rng: &mut dyn RngCore) -> String {
    let email: String = SafeEmail().fake_with_rng(rng);
    let (local, domain) = email.split_once('@').unwrap_or((email.as_str(), "example.com"));
    let tail = format!(".{:08x}@{domain}", rng.random::<u32>());
    match max_len {
        Some(max_len) if max_len > tail.len() => {
            let keep = max_len - tail.len();
            format!("{}{tail}", local.chars().take(keep).collect::<String>())
        }
        // Too short for any address; keep the tag so values stay distinct.
        Some(max_len) => tail[1..].chars().take(max_len).collect(),
        None => format!("{local}{tail}"),
    }
}

fn fit(value: String, max_len: Option<usize>) -> String {
    match max_len {
        Some(max_len) if value.chars().count() > max_len => value.chars().take(max_len).collect(),
        _ => value,
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;

    use super::*;
    use crate::descriptor::DescriptorSet;
    use crate::generators::SeedRng;
    use boilingseed_core::{ColumnType, Constraint, EnumType, Schema, Table, TableKind, UniqueConstraint};

    fn column(position: i16, name: &str, column_type: ColumnType) -> Column {
        Column {
            ordinal_position: position,
            name: name.to_string(),
            column_type,
            is_nullable: false,
            default: None,
            identity: None,
            generated: None,
        }
    }

    fn varchar(len: i32) -> ColumnType {
        let mut column_type = ColumnType::named("character varying");
        column_type.data_type = format!("character varying({len})");
        column_type.character_max_length = Some(len);
        column_type
    }

    fn generator_for(table: Table, enums: Vec<EnumType>) -> ColumnGenerator {
        let schema = DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "public".to_string(),
                tables: vec![table],
            }],
            enums,
        };
        let descriptors = DescriptorSet::from_schema(&schema).expect("descriptors");
        let descriptor = descriptors.iter().next().expect("one entity");
        ColumnGenerator::new(&schema, descriptor)
    }

    #[test]
    fn skips_database_filled_columns() {
        let mut id = column(1, "id", ColumnType::named("integer"));
        id.default = Some("nextval('people_id_seq'::regclass)".to_string());
        let mut created = column(3, "created_at", ColumnType::named("timestamp with time zone"));
        created.default = Some("now()".to_string());
        let table = Table {
            name: "people".to_string(),
            kind: TableKind::Table,
            columns: vec![id, column(2, "email", varchar(40)), created],
            constraints: Vec::new(),
        };

        let generator = generator_for(table, Vec::new());
        assert_eq!(generator.columns().collect::<Vec<_>>(), vec!["email"]);

        let mut rng = SeedRng::seed_from_u64(7);
        let record = generator.generate(&mut rng).expect("record");
        let email = record.get("email").and_then(Value::as_str).expect("email");
        assert!(email.contains('@'));
        assert!(email.chars().count() <= 40);
    }

    #[test]
    fn unique_text_respects_max_length() {
        let table = Table {
            name: "categories".to_string(),
            kind: TableKind::Table,
            columns: vec![column(1, "name", varchar(12))],
            constraints: vec![Constraint::Unique(UniqueConstraint {
                name: Some("categories_name_key".to_string()),
                columns: vec!["name".to_string()],
            })],
        };
        let generator = generator_for(table, Vec::new());
        let mut rng = SeedRng::seed_from_u64(11);
        for _ in 0..50 {
            let record = generator.generate(&mut rng).expect("record");
            let name = record.get("name").and_then(Value::as_str).expect("name");
            assert!(name.chars().count() <= 12, "{name} exceeds limit");
        }
    }

    #[test]
    fn picks_enum_labels() {
        let mut format = ColumnType::named("USER-DEFINED");
        format.data_type = "USER-DEFINED".to_string();
        format.udt_schema = "public".to_string();
        format.udt_name = "book_format".to_string();
        let table = Table {
            name: "books".to_string(),
            kind: TableKind::Table,
            columns: vec![column(1, "format", format)],
            constraints: Vec::new(),
        };
        let labels = vec!["hardcover".to_string(), "ebook".to_string()];
        let generator = generator_for(
            table,
            vec![EnumType {
                schema: "public".to_string(),
                name: "book_format".to_string(),
                labels: labels.clone(),
            }],
        );
        let mut rng = SeedRng::seed_from_u64(3);
        let record = generator.generate(&mut rng).expect("record");
        let value = record.get("format").and_then(Value::as_str).expect("label");
        assert!(labels.iter().any(|label| label == value));
    }

    #[test]
    fn unsupported_required_column_is_a_generator_error() {
        let table = Table {
            name: "blobs".to_string(),
            kind: TableKind::Table,
            columns: vec![column(1, "payload", ColumnType::named("bytea"))],
            constraints: Vec::new(),
        };
        let generator = generator_for(table, Vec::new());
        let mut rng = SeedRng::seed_from_u64(5);
        let err = generator.generate(&mut rng).unwrap_err();
        assert!(matches!(err, GeneratorError::UnsupportedType { .. }));
    }

    #[test]
    fn numeric_values_respect_precision_and_scale() {
        let mut price = ColumnType::named("numeric");
        price.data_type = "numeric(4,2)".to_string();
        price.numeric_precision = Some(4);
        price.numeric_scale = Some(2);
        let table = Table {
            name: "prices".to_string(),
            kind: TableKind::Table,
            columns: vec![column(1, "amount", price)],
            constraints: Vec::new(),
        };
        let generator = generator_for(table, Vec::new());
        let mut rng = SeedRng::seed_from_u64(9);
        for _ in 0..20 {
            let record = generator.generate(&mut rng).expect("record");
            let Some(Value::Float(amount)) = record.get("amount") else {
                panic!("expected float amount");
            };
            assert!(*amount < 100.0 && *amount >= 0.0);
        }
    }

    fn unique_table(name: &str, column_name: &str, column_type: ColumnType) -> Table {
        Table {
            name: name.to_string(),
            kind: TableKind::Table,
            columns: vec![column(1, column_name, column_type)],
            constraints: vec![Constraint::Unique(UniqueConstraint {
                name: Some(format!("{name}_{column_name}_key")),
                columns: vec![column_name.to_string()],
            })],
        }
    }

    fn distinct_texts(generator: &ColumnGenerator, column: &str, rows: usize) -> BTreeSet<String> {
        let mut rng = SeedRng::seed_from_u64(17);
        (0..rows)
            .map(|_| {
                let record = generator.generate(&mut rng).expect("record");
                record
                    .get(column)
                    .and_then(Value::as_str)
                    .expect("text value")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn unique_plain_text_keeps_its_tag_when_the_name_fills_the_limit() {
        let generator = generator_for(
            unique_table("products", "sku_reference", varchar(10)),
            Vec::new(),
        );
        let values = distinct_texts(&generator, "sku_reference", 100);
        assert_eq!(values.len(), 100);
        assert!(values.iter().all(|value| value.chars().count() <= 10));
    }

    #[test]
    fn unique_email_keeps_its_domain_under_a_tight_limit() {
        let generator = generator_for(unique_table("users", "email", varchar(24)), Vec::new());
        let values = distinct_texts(&generator, "email", 100);
        assert_eq!(values.len(), 100);
        for email in &values {
            assert!(email.chars().count() <= 24, "{email} exceeds limit");
            let (local, domain) = email.split_once('@').expect("address");
            assert!(!local.is_empty());
            assert!(domain.contains('.'), "{email} lost its domain");
        }

        let generator = generator_for(unique_table("users", "email", varchar(6)), Vec::new());
        let values = distinct_texts(&generator, "email", 50);
        assert!(values.len() > 45);
        assert!(values.iter().all(|value| value.chars().count() <= 6));
    }

    fn numeric(precision: i32, scale: i32) -> ColumnType {
        let mut column_type = ColumnType::named("numeric");
        column_type.data_type = format!("numeric({precision},{scale})");
        column_type.numeric_precision = Some(precision);
        column_type.numeric_scale = Some(scale);
        column_type
    }

    fn floats(generator: &ColumnGenerator, column: &str, rows: usize) -> Vec<f64> {
        let mut rng = SeedRng::seed_from_u64(23);
        (0..rows)
            .map(|_| match generator.generate(&mut rng).expect("record").get(column) {
                Some(Value::Float(value)) => *value,
                other => panic!("expected float, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn fractional_numeric_columns_use_their_whole_range() {
        let generator = generator_for(unique_table("rates", "ratio", numeric(2, 2)), Vec::new());
        let values = floats(&generator, "ratio", 30);
        assert!(values.iter().all(|value| (0.0..1.0).contains(value)));
        let distinct: BTreeSet<String> = values.iter().map(|value| format!("{value:.2}")).collect();
        assert!(distinct.len() > 10);
    }

    #[test]
    fn unique_numeric_columns_widen_past_the_default_range() {
        let generator = generator_for(unique_table("ledgers", "amount", numeric(12, 2)), Vec::new());
        let values = floats(&generator, "amount", 50);
        assert!(values.iter().all(|value| *value < 10_000_000_000.0));
        assert!(values.iter().any(|value| *value > DEFAULT_FLOAT_MAX));
    }
}
