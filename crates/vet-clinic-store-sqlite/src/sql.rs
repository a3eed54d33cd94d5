// crates/vet-clinic-store-sqlite/src/sql.rs
// ============================================================================
// Module: SQLite Statement Helpers
// Description: Table DDL, filter clauses, and JSON <-> SQL value conversion.
// Purpose: Translate table descriptors into parameterized SQL.
// Dependencies: rusqlite, serde_json, vet-clinic-core
// ============================================================================

//! ## Overview
//! Identifiers interpolated into SQL come only from static table descriptors
//! or from filter columns already checked against them. Values always travel
//! as bound parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use serde_json::Number;
use serde_json::Value;
use vet_clinic_core::FieldMap;
use vet_clinic_core::Filter;
use vet_clinic_core::PRIMARY_KEY;
use vet_clinic_core::TableSpec;

use crate::config::SqliteStoreError;
use crate::config::db_error;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Alias of the base table in generated selects.
pub(crate) const BASE_ALIAS: &str = "base";

/// Renders the idempotent `CREATE TABLE` statement for a table.
pub(crate) fn create_table_sql(table: &TableSpec) -> String {
    let mut columns = vec![format!("{PRIMARY_KEY} INTEGER PRIMARY KEY AUTOINCREMENT")];
    for column in table.columns {
        let constraint = if column.nullable { "" } else { " NOT NULL" };
        columns.push(format!("{} {}{constraint}", column.column, column.kind.sql_type()));
    }
    format!("CREATE TABLE IF NOT EXISTS {} ({});", table.name, columns.join(", "))
}

/// Creates every table inside one transaction.
pub(crate) fn create_tables(
    connection: &mut Connection,
    tables: &[&TableSpec],
) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    for table in tables {
        tx.execute_batch(&create_table_sql(table)).map_err(|err| db_error(&err))?;
    }
    tx.commit().map_err(|err| db_error(&err))
}

// ============================================================================
// SECTION: Clauses
// ============================================================================

/// Renders a conjunctive `WHERE` clause, appending bound values to `params`.
///
/// Returns an empty string when there are no filters.
pub(crate) fn where_clause(filters: &[Filter], params: &mut Vec<SqlValue>) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let mut terms = Vec::with_capacity(filters.len());
    for filter in filters {
        match filter {
            Filter::Eq {
                column,
                value,
            } => {
                if value.is_null() {
                    terms.push(format!("{BASE_ALIAS}.{column} IS NULL"));
                } else {
                    params.push(to_sql(value));
                    terms.push(format!("{BASE_ALIAS}.{column} = ?{}", params.len()));
                }
            }
            Filter::In {
                column,
                values,
            } => {
                if values.is_empty() {
                    terms.push("0".to_string());
                    continue;
                }
                let mut slots = Vec::with_capacity(values.len());
                for value in values {
                    params.push(to_sql(value));
                    slots.push(format!("?{}", params.len()));
                }
                terms.push(format!("{BASE_ALIAS}.{column} IN ({})", slots.join(", ")));
            }
            Filter::AtLeast {
                column,
                value,
            } => {
                params.push(to_sql(value));
                terms.push(format!("{BASE_ALIAS}.{column} >= ?{}", params.len()));
            }
            Filter::AtMost {
                column,
                value,
            } => {
                params.push(to_sql(value));
                terms.push(format!("{BASE_ALIAS}.{column} <= ?{}", params.len()));
            }
        }
    }
    format!(" WHERE {}", terms.join(" AND "))
}

// ============================================================================
// SECTION: Values
// ============================================================================

/// Converts a JSON value into a bindable `SQLite` value.
///
/// Booleans bind as integers; arrays and objects bind as JSON text.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => number.as_i64().map_or_else(
            || number.as_f64().map_or(SqlValue::Null, SqlValue::Real),
            SqlValue::Integer,
        ),
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Converts a stored `SQLite` value into JSON.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Reads a row whose columns are listed in `names`, in order.
pub(crate) fn read_row(row: &Row<'_>, names: &[&str]) -> rusqlite::Result<FieldMap> {
    let mut map = FieldMap::new();
    for (index, name) in names.iter().enumerate() {
        map.insert((*name).to_string(), from_sql(row.get_ref(index)?));
    }
    Ok(map)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use rusqlite::types::Value as SqlValue;
    use serde_json::json;
    use vet_clinic_core::Filter;
    use vet_clinic_core::entities::directory::PETS;

    use super::create_table_sql;
    use super::to_sql;
    use super::where_clause;

    #[test]
    fn create_table_marks_required_columns() {
        let sql = create_table_sql(&PETS);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS pets (id INTEGER PRIMARY KEY"));
        assert!(sql.contains("client_id INTEGER NOT NULL"));
        assert!(sql.contains("breed TEXT,") || sql.contains("breed TEXT)"));
    }

    #[test]
    fn where_clause_numbers_parameters_in_order() {
        let mut params = Vec::new();
        let clause = where_clause(
            &[
                Filter::eq("client_id", 7),
                Filter::any_of("status", vec![json!("scheduled"), json!("confirmed")]),
            ],
            &mut params,
        );
        assert_eq!(clause, " WHERE base.client_id = ?1 AND base.status IN (?2, ?3)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn range_bounds_render_inclusive_comparisons() {
        let mut params = Vec::new();
        let clause = where_clause(
            &[Filter::at_least("date", "2026-11-01"), Filter::at_most("date", "2026-11-30")],
            &mut params,
        );
        assert_eq!(clause, " WHERE base.date >= ?1 AND base.date <= ?2");
        assert_eq!(params, vec![
            SqlValue::Text("2026-11-01".to_string()),
            SqlValue::Text("2026-11-30".to_string())
        ]);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let mut params = Vec::new();
        let clause = where_clause(&[Filter::any_of("status", Vec::new())], &mut params);
        assert_eq!(clause, " WHERE 0");
        assert!(params.is_empty());
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(to_sql(&json!(["a"])), SqlValue::Text("[\"a\"]".to_string()));
    }
}
