use boilingseed_core::ColumnType;

/// Alias for the row in `returning` and `select` clauses.
pub const ROW_ALIAS: &str = "seeded_row";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Type used to cast a bound parameter to the column's type.
///
/// Enums and arrays are named through their catalog type; builtins use the
/// formatted type, which keeps modifiers such as `numeric(10,2)`.
pub fn cast_type(column_type: &ColumnType) -> String {
    if column_type.is_user_defined() || column_type.data_type.eq_ignore_ascii_case("ARRAY") {
        qualified_table(&column_type.udt_schema, &column_type.udt_name)
    } else {
        column_type.data_type.clone()
    }
}

pub fn count_sql(table: &str) -> String {
    format!("select count(*) from {table}")
}

/// `insert` returning the stored row as JSON. Parameters are numbered in `columns` order.
pub fn insert_sql(table: &str, columns: &[(&str, &ColumnType)]) -> String {
    if columns.is_empty() {
        return format!(
            "insert into {table} as {ROW_ALIAS} default values returning to_jsonb({ROW_ALIAS})"
        );
    }

    let names = columns
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let params = columns
        .iter()
        .enumerate()
        .map(|(idx, (_, column_type))| format!("${}::{}", idx + 1, cast_type(column_type)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "insert into {table} as {ROW_ALIAS} ({names}) values ({params}) returning to_jsonb({ROW_ALIAS})"
    )
}

/// Random sample of existing rows; `$1` binds the limit when `limited`.
pub fn list_sql(table: &str, limited: bool) -> String {
    let mut sql = format!("select to_jsonb({ROW_ALIAS}) from {table} as {ROW_ALIAS} order by random()");
    if limited {
        sql.push_str(" limit $1");
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("books"), "\"books\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified_table("public", "books"), "\"public\".\"books\"");
    }

    #[test]
    fn casts_parameters_to_column_types() {
        let mut price = ColumnType::named("numeric(10,2)");
        price.udt_name = "numeric".to_string();
        let mut format = ColumnType::named("USER-DEFINED");
        format.udt_schema = "public".to_string();
        format.udt_name = "book_format".to_string();

        let sql = insert_sql(
            "\"public\".\"books\"",
            &[("price", &price), ("format", &format)],
        );
        assert_eq!(
            sql,
            "insert into \"public\".\"books\" as seeded_row (\"price\", \"format\") \
             values ($1::numeric(10,2), $2::\"public\".\"book_format\") \
             returning to_jsonb(seeded_row)"
        );
    }

    #[test]
    fn empty_records_use_default_values() {
        let sql = insert_sql("\"public\".\"counters\"", &[]);
        assert!(sql.contains("default values"));
    }

    #[test]
    fn limits_candidate_listing_only_when_asked() {
        assert!(!list_sql("\"public\".\"authors\"", false).contains("limit"));
        assert!(list_sql("\"public\".\"authors\"", true).ends_with("limit $1"));
    }
}
