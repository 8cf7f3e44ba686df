//! Coercion helpers for feeding loosely typed input (CSV cells, JSON fields,
//! API payloads) into parameter lists. Absent values become `RowValues::Null`.

use chrono::NaiveDateTime;

use crate::error::SqlServerError;
use crate::types::RowValues;

/// Default format accepted by [`none_or_date`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format accepted by [`iso_date`], e.g. `2024-03-01T12:00:00.000Z`.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// SQL Server parameter list for `n` values: `@P1, @P2, ...`.
#[must_use]
pub fn pre_parameterized_values(n: usize) -> String {
    (1..=n)
        .map(|i| format!("@P{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// ODBC-style parameter list for `n` values: `?, ?, ...`.
#[must_use]
pub fn question_marks(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Quote an identifier with brackets, escaping embedded `]`.
#[must_use]
pub fn bracket_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// # Errors
/// Returns `SqlServerError::ParameterError` if the value is not an integer.
pub fn none_or_int(value: Option<&str>) -> Result<RowValues, SqlServerError> {
    let Some(raw) = value else {
        return Ok(RowValues::Null);
    };
    raw.trim()
        .parse::<i64>()
        .map(RowValues::Int)
        .map_err(|e| SqlServerError::ParameterError(format!("none_or_int({raw}): {e}")))
}

/// # Errors
/// Returns `SqlServerError::ParameterError` if the value is not a number.
pub fn none_or_float(value: Option<&str>) -> Result<RowValues, SqlServerError> {
    let Some(raw) = value else {
        return Ok(RowValues::Null);
    };
    raw.trim()
        .parse::<f64>()
        .map(RowValues::Float)
        .map_err(|e| SqlServerError::ParameterError(format!("none_or_float({raw}): {e}")))
}

/// Parse a timestamp using `format`, or [`DEFAULT_DATE_FORMAT`] when `None`.
///
/// # Errors
/// Returns `SqlServerError::ParameterError` if the value does not match the format.
pub fn none_or_date(value: Option<&str>, format: Option<&str>) -> Result<RowValues, SqlServerError> {
    let Some(raw) = value else {
        return Ok(RowValues::Null);
    };
    let format = format.unwrap_or(DEFAULT_DATE_FORMAT);
    NaiveDateTime::parse_from_str(raw, format)
        .map(RowValues::Timestamp)
        .map_err(|e| SqlServerError::ParameterError(format!("none_or_date({raw}): {e}")))
}

/// # Errors
/// Returns `SqlServerError::ParameterError` if the value is not an ISO 8601 UTC timestamp.
pub fn iso_date(value: Option<&str>) -> Result<RowValues, SqlServerError> {
    none_or_date(value, Some(ISO_DATE_FORMAT))
}

/// `1`/`0` for a bit column, or `'Y'`/`'N'` when `yes_no` is set.
#[must_use]
pub fn none_or_sql_server_bit(value: Option<bool>, yes_no: bool) -> RowValues {
    match (value, yes_no) {
        (Some(true), false) => RowValues::Int(1),
        (Some(false), false) => RowValues::Int(0),
        (Some(true), true) => RowValues::Text("Y".to_string()),
        (Some(false), true) => RowValues::Text("N".to_string()),
        (None, _) => RowValues::Null,
    }
}

/// Upper-case a UUID string the way SQL Server renders `uniqueidentifier`.
#[must_use]
pub fn capitalized_uuid(value: Option<&str>) -> RowValues {
    value.map_or(RowValues::Null, |v| RowValues::Text(v.to_uppercase()))
}
