use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::schema::{DatabaseSchema, table_key};

/// Validate the parts of a schema snapshot the seeder relies on.
///
/// This checks:
/// - duplicate tables/columns
/// - key and unique columns exist
/// - foreign keys have matching column arity and point at existing base tables
pub fn validate_schema(schema: &DatabaseSchema) -> Result<()> {
    let mut catalog: BTreeMap<String, (bool, BTreeSet<&str>)> = BTreeMap::new();

    for (schema_name, table) in schema.tables() {
        let key = table_key(schema_name, &table.name);
        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {key}.{}",
                    column.name
                )));
            }
        }
        if catalog
            .insert(key.clone(), (table.is_seedable(), columns))
            .is_some()
        {
            return Err(Error::InvalidSchema(format!("duplicate table name: {key}")));
        }
    }

    for (schema_name, table) in schema.tables() {
        let key = table_key(schema_name, &table.name);
        let Some((_, columns)) = catalog.get(&key) else {
            continue;
        };
        let require = |column: &str, what: &str| -> Result<()> {
            if columns.contains(column) {
                Ok(())
            } else {
                Err(Error::InvalidSchema(format!(
                    "{what} column not found: {key}.{column}"
                )))
            }
        };

        for constraint in &table.constraints {
            match constraint {
                Constraint::PrimaryKey(pk) => {
                    for column in &pk.columns {
                        require(column, "primary key")?;
                    }
                }
                Constraint::Unique(unique) => {
                    for column in &unique.columns {
                        require(column, "unique")?;
                    }
                }
                Constraint::ForeignKey(fk) => {
                    for column in &fk.columns {
                        require(column, "foreign key")?;
                    }
                    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
                        return Err(Error::InvalidSchema(format!(
                            "foreign key on {key} maps {} column(s) to {} referenced column(s)",
                            fk.columns.len(),
                            fk.referenced_columns.len()
                        )));
                    }

                    let referenced = fk.referenced_key();
                    let (seedable, ref_columns) = catalog.get(&referenced).ok_or_else(|| {
                        Error::InvalidSchema(format!("referenced table not found: {referenced}"))
                    })?;
                    if !seedable {
                        return Err(Error::InvalidSchema(format!(
                            "foreign key on {key} references non-table relation {referenced}"
                        )));
                    }
                    for column in &fk.referenced_columns {
                        if !ref_columns.contains(column.as_str()) {
                            return Err(Error::InvalidSchema(format!(
                                "referenced column not found: {referenced}.{column}"
                            )));
                        }
                    }
                }
                Constraint::Check(_) => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForeignKey;
    use crate::schema::{Column, Schema, Table, TableKind};
    use crate::types::ColumnType;

    fn table(name: &str, columns: &[&str], constraints: Vec<Constraint>) -> Table {
        Table {
            name: name.to_string(),
            kind: TableKind::Table,
            columns: columns
                .iter()
                .enumerate()
                .map(|(idx, name)| Column {
                    ordinal_position: idx as i16 + 1,
                    name: name.to_string(),
                    column_type: ColumnType::named("integer"),
                    is_nullable: false,
                    default: None,
                    identity: None,
                    generated: None,
                })
                .collect(),
            constraints,
        }
    }

    fn wrap(tables: Vec<Table>) -> DatabaseSchema {
        DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "public".to_string(),
                tables,
            }],
            enums: Vec::new(),
        }
    }

    fn fk(columns: &[&str], table: &str, referenced: &[&str]) -> Constraint {
        Constraint::ForeignKey(ForeignKey {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_schema: "public".to_string(),
            referenced_table: table.to_string(),
            referenced_columns: referenced.iter().map(|c| c.to_string()).collect(),
        })
    }

    #[test]
    fn accepts_consistent_schema() {
        let schema = wrap(vec![
            table("authors", &["id"], Vec::new()),
            table("books", &["id", "author_id"], vec![fk(&["author_id"], "authors", &["id"])]),
        ]);
        validate_schema(&schema).expect("valid schema");
    }

    #[test]
    fn rejects_missing_referenced_table() {
        let schema = wrap(vec![table(
            "books",
            &["id", "author_id"],
            vec![fk(&["author_id"], "authors", &["id"])],
        )]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("public.authors"));
    }

    #[test]
    fn rejects_mismatched_fk_arity() {
        let schema = wrap(vec![
            table("authors", &["id", "code"], Vec::new()),
            table(
                "books",
                &["id", "author_id"],
                vec![fk(&["author_id"], "authors", &["id", "code"])],
            ),
        ]);
        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn rejects_reference_to_view() {
        let mut view = table("author_view", &["id"], Vec::new());
        view.kind = TableKind::View;
        let schema = wrap(vec![
            view,
            table("books", &["id", "author_id"], vec![fk(&["author_id"], "author_view", &["id"])]),
        ]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("non-table"));
    }
}
