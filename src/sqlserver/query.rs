use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryItem};
use tracing::debug;

use super::options::{QueryOptions, QueryParams};
use super::params::bind_query_params;
use super::{MssqlClient, SqlServer};
use crate::error::SqlServerError;
use crate::results::ResultSet;
use crate::translation::translate_placeholders;
use crate::types::RowValues;

impl SqlServer {
    /// Run a statement and return the rows of its first result set.
    ///
    /// `?` placeholders are rewritten to `@Pn` unless disabled in `options`.
    /// With [`QueryParams::Many`] the statement runs once per parameter list
    /// and the result only carries the affected-row count.
    ///
    /// ```no_run
    /// # use sqlserver_helpers::prelude::*;
    /// # async fn demo(db: &mut SqlServer) -> Result<(), SqlServerError> {
    /// let rows = db
    ///     .do_query(
    ///         "SELECT name FROM sys.tables WHERE name LIKE ?",
    ///         QueryOptions::default().with_params(vec!["metric%".into()]),
    ///     )
    ///     .await?;
    /// for row in &rows.results {
    ///     println!("{}", row.get("name").unwrap_or(&RowValues::Null));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` wrapping parameter validation or
    /// driver errors, with the query text in its context.
    pub async fn do_query(
        &mut self,
        sql: &str,
        options: QueryOptions,
    ) -> Result<ResultSet, SqlServerError> {
        match self.run_statement(sql, &options).await {
            Ok(rs) => Ok(rs),
            Err(e) => Err(self.operation_error("do_query", format!(" while doing query `{sql}`"), e)),
        }
    }

    pub(crate) async fn run_statement(
        &mut self,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<ResultSet, SqlServerError> {
        let sql = translate_placeholders(sql, options.translate_placeholders);
        debug!(database = %self.options.database, sql = %sql, "executing statement");

        let result = match &options.params {
            QueryParams::None => collect_first_result_set(&mut self.client, &sql, &[]).await?,
            QueryParams::Single(params) => {
                collect_first_result_set(&mut self.client, &sql, params).await?
            }
            QueryParams::Many(sets) => {
                let affected = execute_many(&mut self.client, &sql, sets).await?;
                ResultSet::affected(affected)
            }
        };

        if options.commit {
            self.commit_pending().await?;
        }
        Ok(result)
    }

    /// Execute `sql` once per parameter set and commit.
    pub(crate) async fn execute_many_committed(
        &mut self,
        sql: &str,
        sets: &[Vec<RowValues>],
    ) -> Result<usize, SqlServerError> {
        let affected = execute_many(&mut self.client, sql, sets).await?;
        self.commit_pending().await?;
        Ok(affected)
    }
}

/// Check that `sets` is non-empty and every set has the width of the first.
pub(crate) fn validate_param_sets(sets: &[Vec<RowValues>]) -> Result<usize, SqlServerError> {
    let first = sets.first().ok_or_else(|| {
        SqlServerError::ParameterError(
            "execute_many requires at least one parameter set".to_string(),
        )
    })?;
    let width = first.len();
    if let Some((i, set)) = sets.iter().enumerate().find(|(_, s)| s.len() != width) {
        return Err(SqlServerError::ParameterError(format!(
            "parameter set {i} has {} values, expected {width}",
            set.len()
        )));
    }
    Ok(width)
}

async fn execute_many(
    client: &mut MssqlClient,
    sql: &str,
    sets: &[Vec<RowValues>],
) -> Result<usize, SqlServerError> {
    validate_param_sets(sets)?;

    let mut affected: u64 = 0;
    for params in sets {
        let result = bind_query_params(sql, params).execute(&mut *client).await?;
        affected += result.rows_affected().iter().sum::<u64>();
    }

    usize::try_from(affected).map_err(|e| {
        SqlServerError::ExecutionError(format!("Invalid rows affected count: {e}"))
    })
}

/// Run a query and keep the rows of the first result set that has columns.
///
/// Later result sets are drained and discarded.
async fn collect_first_result_set(
    client: &mut MssqlClient,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlServerError> {
    let mut stream = bind_query_params(sql, params).query(client).await?;

    let mut result_set: Option<(usize, ResultSet)> = None;
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                if result_set.is_none() && !meta.columns().is_empty() {
                    let names: Vec<String> =
                        meta.columns().iter().map(|c| c.name().to_string()).collect();
                    let mut rs = ResultSet::with_capacity(16);
                    rs.set_column_names(Arc::new(names));
                    result_set = Some((meta.result_index(), rs));
                }
            }
            QueryItem::Row(row) => {
                if let Some((index, rs)) = result_set.as_mut() {
                    if row.result_index() == *index {
                        let values = row
                            .into_iter()
                            .map(column_value)
                            .collect::<Result<Vec<_>, _>>()?;
                        rs.add_row_values(values);
                    }
                }
            }
        }
    }

    Ok(result_set.map(|(_, rs)| rs).unwrap_or_default())
}

/// Map one driver cell onto `RowValues`.
pub(crate) fn column_value(data: ColumnData<'static>) -> Result<RowValues, SqlServerError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.map(|s| RowValues::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string().to_uppercase())),
        ColumnData::Binary(v) => v.map(|b| RowValues::Blob(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(numeric_to_f64(n.value(), n.scale()))),
        ColumnData::Xml(v) => v.map(|x| RowValues::Text(x.into_owned().into_string())),
        temporal => temporal_value(&temporal)?,
    };
    Ok(value.unwrap_or(RowValues::Null))
}

fn temporal_value(data: &ColumnData<'static>) -> Result<Option<RowValues>, SqlServerError> {
    let value = match data {
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(RowValues::Timestamp)
        }
        ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN)))
        }
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| RowValues::Text(format_time(t))),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(data)?.map(|dt| RowValues::Timestamp(dt.naive_utc()))
        }
        _ => None,
    };
    Ok(value)
}

/// `HH:MM:SS.fffffff`, the 100ns precision of SQL Server's `time(7)`.
fn format_time(t: NaiveTime) -> String {
    format!("{}.{:07}", t.format("%H:%M:%S"), t.nanosecond() / 100)
}

#[allow(clippy::cast_precision_loss)]
fn numeric_to_f64(value: i128, scale: u8) -> f64 {
    value as f64 / 10_f64.powi(i32::from(scale))
}
