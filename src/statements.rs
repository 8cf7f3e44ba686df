//! SQL text builders used by the paginated, bulk-write and mirror helpers.

use std::sync::LazyLock;

use regex::Regex;

use crate::data_helper::{bracket_identifier, pre_parameterized_values};
use crate::error::SqlServerError;

/// Name of the timestamp column added by `add_dtm_column`.
pub const AS_OF_DTM_COLUMN: &str = "as_of_dtm";

/// Schema that bulk writes and mirrors target.
pub const DEFAULT_SCHEMA: &str = "dbo";

static ORDER_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\border\s+by\b").expect("static regex"));

/// Append `OFFSET .. FETCH NEXT ..` to an ordered query.
///
/// The clause goes on its own line so a trailing `--` comment in `sql`
/// cannot swallow it.
///
/// # Errors
/// Returns `SqlServerError::ParameterError` if the query has no `ORDER BY`
/// clause or `page_size` is zero.
pub fn paginated_sql(sql: &str, index: usize, page_size: usize) -> Result<String, SqlServerError> {
    if page_size == 0 {
        return Err(SqlServerError::ParameterError(
            "page_size must be greater than zero".to_string(),
        ));
    }
    if !ORDER_BY.is_match(sql) {
        return Err(SqlServerError::ParameterError(
            "Paginated queries must have an ORDER BY clause".to_string(),
        ));
    }
    let base = sql.trim_end().trim_end_matches(';').trim_end();
    Ok(format!(
        "{base}\nOFFSET {index} ROWS FETCH NEXT {page_size} ROWS ONLY"
    ))
}

/// Three-part name `[database].[dbo].[table]`.
#[must_use]
pub fn qualified_table(database: &str, table: &str) -> String {
    format!(
        "{}.{}.{}",
        bracket_identifier(database),
        bracket_identifier(DEFAULT_SCHEMA),
        bracket_identifier(table)
    )
}

/// `INSERT INTO [db].[dbo].[table] ([c1], ...) VALUES (@P1, ...)`.
#[must_use]
pub fn insert_statement<S: AsRef<str>>(database: &str, table: &str, columns: &[S]) -> String {
    let column_list = columns
        .iter()
        .map(|c| bracket_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({column_list}) VALUES ({})",
        qualified_table(database, table),
        pre_parameterized_values(columns.len())
    )
}

/// Ordered `SELECT` over the given columns, optionally filtered by a raw
/// `WHERE` condition supplied by the caller.
#[must_use]
pub fn select_statement<S: AsRef<str>>(
    database: &str,
    table: &str,
    columns: &[S],
    where_conditional: Option<&str>,
    order_by: &str,
    descending: bool,
) -> String {
    let column_list = columns
        .iter()
        .map(|c| bracket_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {column_list} FROM {}", qualified_table(database, table));
    if let Some(condition) = where_conditional.map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(&bracket_identifier(order_by));
    sql.push_str(if descending { " DESC" } else { " ASC" });
    sql
}

/// Destination column list, with `as_of_dtm` inserted at `dtm_index` when requested.
///
/// # Errors
/// Returns `SqlServerError::ParameterError` if `dtm_index` is past the end of the list.
pub fn dest_columns<S: AsRef<str>>(
    columns: &[S],
    add_dtm_column: bool,
    dtm_index: usize,
) -> Result<Vec<String>, SqlServerError> {
    let mut dest: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    if add_dtm_column {
        if dtm_index > dest.len() {
            return Err(SqlServerError::ParameterError(format!(
                "add_dtm_column_index {dtm_index} is out of range for {} columns",
                dest.len()
            )));
        }
        dest.insert(dtm_index, AS_OF_DTM_COLUMN.to_string());
    }
    Ok(dest)
}
