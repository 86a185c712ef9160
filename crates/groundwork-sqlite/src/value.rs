//! Conversion between `SqlValue` and SQLite arguments and columns.

use groundwork_sql::{Result, SqlError, SqlValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row as _, Sqlite, TypeInfo as _, ValueRef as _};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Prepares `query` with all parameters bound in order.
pub(crate) fn prepare(query: &str, params: Vec<SqlValue>) -> SqliteQuery<'_> {
    params.into_iter().fold(sqlx::query(query), bind_value)
}

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Returns the column names of a row.
pub(crate) fn column_names(row: &SqliteRow) -> Vec<String> {
    use sqlx::Column as _;

    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// Reads all values of a row by their storage class.
pub(crate) fn decode_row(row: &SqliteRow) -> Result<Vec<SqlValue>> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<SqlValue> {
    let raw = row.try_get_raw(index).map_err(SqlError::backend)?;

    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let value = match raw.type_info().name() {
        "NULL" => SqlValue::Null,
        "INTEGER" | "BOOLEAN" => SqlValue::Int(get(row, index)?),
        "REAL" => SqlValue::Float(get(row, index)?),
        "BLOB" => SqlValue::Blob(get(row, index)?),
        _ => SqlValue::Text(get(row, index)?),
    };

    Ok(value)
}

fn get<'r, T>(row: &'r SqliteRow, index: usize) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite>,
{
    row.try_get_unchecked(index).map_err(SqlError::backend)
}
