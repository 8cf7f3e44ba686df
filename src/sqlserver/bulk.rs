use std::ops::Range;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use super::SqlServer;
use super::options::{MirrorOptions, QueryOptions, WriteOptions};
use crate::error::SqlServerError;
use crate::statements::{dest_columns, insert_statement, select_statement};
use crate::types::RowValues;

impl SqlServer {
    /// Delete every row of `table` with `TRUNCATE TABLE` and commit.
    ///
    /// `table` is used verbatim, so a qualified `[db].[schema].[t]` works.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if the statement fails.
    pub async fn truncate_table(&mut self, table: &str) -> Result<bool, SqlServerError> {
        match self.truncate(table).await {
            Ok(()) => Ok(true),
            Err(e) => Err(self.operation_error("truncate_table", format!(" on table {table}"), e)),
        }
    }

    async fn truncate(&mut self, table: &str) -> Result<(), SqlServerError> {
        info!(database = %self.options.database, table, "truncating table");
        self.batch(&format!("TRUNCATE TABLE {table}")).await?;
        self.commit_pending().await
    }

    /// Insert `records` into `[db].[dbo].[table]` in pages, committing each page.
    ///
    /// Every record must have one value per entry in `columns`. With
    /// `add_dtm_column`, an `as_of_dtm` value (local time, one per page) is
    /// spliced in at `add_dtm_column_index`; do not list it in `columns`.
    /// Returns the number of records written.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation`; a failed page is reported as
    /// `SqlServerError::Batch` with its record range. Pages before it stay committed.
    pub async fn write_records<S: AsRef<str>>(
        &mut self,
        records: &[Vec<RowValues>],
        columns: &[S],
        table: &str,
        options: WriteOptions,
    ) -> Result<usize, SqlServerError> {
        match self.write_pages(records, columns, table, &options).await {
            Ok(written) => Ok(written),
            Err(e) => Err(self.operation_error("write_records", format!(" on table {table}"), e)),
        }
    }

    async fn write_pages<S: AsRef<str>>(
        &mut self,
        records: &[Vec<RowValues>],
        columns: &[S],
        table: &str,
        options: &WriteOptions,
    ) -> Result<usize, SqlServerError> {
        if let Some(i) = records.iter().position(|r| r.len() != columns.len()) {
            return Err(SqlServerError::ParameterError(format!(
                "record {i} has {} values, expected {}",
                records[i].len(),
                columns.len()
            )));
        }

        let dest = dest_columns(columns, options.add_dtm_column, options.add_dtm_column_index)?;
        if options.truncate {
            self.truncate(table).await?;
        }
        let sql = insert_statement(&self.options.database, table, &dest);

        let mut written = 0;
        for range in page_ranges(records.len(), options.effective_page_size()) {
            let page = &records[range.clone()];
            let outcome = if options.add_dtm_column {
                let stamped = stamp_page(page, options.add_dtm_column_index, now())?;
                self.execute_many_committed(&sql, &stamped).await
            } else {
                self.execute_many_committed(&sql, page).await
            };
            outcome.map_err(|e| SqlServerError::Batch {
                start: range.start,
                end: range.end,
                database: self.options.database.clone(),
                source: Box::new(e),
            })?;
            written += page.len();
            debug!(written, total = records.len(), table, "wrote page");
        }

        info!(written, table, "write_records finished");
        Ok(written)
    }

    /// Copy rows of `source_table` on this server into `dest_table` on `dest`.
    ///
    /// Rows are read in `ORDER BY` pages of the listed `source_columns` and
    /// inserted under the same column names. The destination is truncated
    /// first unless `options.truncate` is false. Returns the rows written.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if validation, a read, or a write fails.
    pub async fn mirror_table<S: AsRef<str>>(
        &mut self,
        source_table: &str,
        source_columns: &[S],
        dest: &mut SqlServer,
        dest_table: &str,
        options: MirrorOptions,
    ) -> Result<usize, SqlServerError> {
        match mirror(self, Some(dest), source_table, source_columns, dest_table, &options).await {
            Ok(written) => Ok(written),
            Err(e) => Err(self.operation_error(
                "mirror_table",
                format!(" mirroring {source_table} to {dest_table}"),
                e,
            )),
        }
    }

    /// [`SqlServer::mirror_table`] with source and destination on this connection.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if validation, a read, or a write fails.
    pub async fn mirror_table_within<S: AsRef<str>>(
        &mut self,
        source_table: &str,
        source_columns: &[S],
        dest_table: &str,
        options: MirrorOptions,
    ) -> Result<usize, SqlServerError> {
        match mirror(self, None, source_table, source_columns, dest_table, &options).await {
            Ok(written) => Ok(written),
            Err(e) => Err(self.operation_error(
                "mirror_table",
                format!(" mirroring {source_table} to {dest_table}"),
                e,
            )),
        }
    }
}

async fn mirror<S: AsRef<str>>(
    source: &mut SqlServer,
    mut dest: Option<&mut SqlServer>,
    source_table: &str,
    source_columns: &[S],
    dest_table: &str,
    options: &MirrorOptions,
) -> Result<usize, SqlServerError> {
    let dest_database = pick(source, &mut dest).options.database.clone();
    let plan = MirrorPlan::new(
        &source.options.database,
        source_table,
        source_columns,
        &dest_database,
        dest_table,
        options,
    )?;
    if options.truncate {
        pick(source, &mut dest).truncate(dest_table).await?;
    }

    let read_options = QueryOptions::default().with_translation(false);
    let mut written = 0;
    let mut index = 0;
    loop {
        let quota = PageQuota::new(options.limit, written);
        if quota == PageQuota::Exhausted {
            break;
        }

        let (page, next) = source
            .paginated(&plan.select, index, plan.page_size, &read_options)
            .await?;
        if page.is_empty() {
            break;
        }
        let mut rows = page.into_value_rows();
        quota.apply(&mut rows);
        if options.add_dtm_column {
            rows = stamp_page(&rows, options.add_dtm_column_index, now())?;
        }

        let target = pick(source, &mut dest);
        target
            .execute_many_committed(&plan.insert, &rows)
            .await
            .map_err(|e| SqlServerError::Batch {
                start: written,
                end: written + rows.len(),
                database: target.options.database.clone(),
                source: Box::new(e),
            })?;
        written += rows.len();
        index = next;
        debug!(written, source_table, dest_table, "mirrored page");
    }

    info!(written, source_table, dest_table, "mirror_table finished");
    Ok(written)
}

/// Statements and page size for one mirror run, validated before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MirrorPlan {
    pub select: String,
    pub insert: String,
    pub page_size: usize,
}

impl MirrorPlan {
    pub(crate) fn new<S: AsRef<str>>(
        source_database: &str,
        source_table: &str,
        source_columns: &[S],
        dest_database: &str,
        dest_table: &str,
        options: &MirrorOptions,
    ) -> Result<Self, SqlServerError> {
        let order_by: &str = source_columns
            .get(options.order_by_column_index)
            .ok_or_else(|| {
                SqlServerError::ParameterError(format!(
                    "order_by_column_index {} is out of range for {} source columns",
                    options.order_by_column_index,
                    source_columns.len()
                ))
            })?
            .as_ref();
        let dest_cols = dest_columns(
            source_columns,
            options.add_dtm_column,
            options.add_dtm_column_index,
        )?;

        Ok(MirrorPlan {
            select: select_statement(
                source_database,
                source_table,
                source_columns,
                options.where_conditional.as_deref(),
                order_by,
                options.order_by_desc,
            ),
            insert: insert_statement(dest_database, dest_table, &dest_cols),
            page_size: options.effective_page_size(),
        })
    }
}

/// How many rows the next mirrored page may contribute under `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageQuota {
    Unlimited,
    Rows(usize),
    /// The limit is reached; the source must not be read again.
    Exhausted,
}

impl PageQuota {
    pub(crate) fn new(limit: Option<usize>, written: usize) -> Self {
        match limit.map(|limit| limit.saturating_sub(written)) {
            None => PageQuota::Unlimited,
            Some(0) => PageQuota::Exhausted,
            Some(n) => PageQuota::Rows(n),
        }
    }

    /// Cut `rows` down to the quota.
    pub(crate) fn apply<T>(self, rows: &mut Vec<T>) {
        match self {
            PageQuota::Unlimited => {}
            PageQuota::Rows(n) => rows.truncate(n),
            PageQuota::Exhausted => rows.clear(),
        }
    }
}

fn pick<'a>(source: &'a mut SqlServer, dest: &'a mut Option<&mut SqlServer>) -> &'a mut SqlServer {
    match dest {
        Some(dest) => &mut **dest,
        None => source,
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Split `len` records into consecutive ranges of at most `page_size`.
pub(crate) fn page_ranges(len: usize, page_size: usize) -> impl Iterator<Item = Range<usize>> {
    let page_size = page_size.max(1);
    (0..len)
        .step_by(page_size)
        .map(move |start| start..(start + page_size).min(len))
}

/// Copy `page`, splicing `stamp` into each record at `index`.
pub(crate) fn stamp_page(
    page: &[Vec<RowValues>],
    index: usize,
    stamp: NaiveDateTime,
) -> Result<Vec<Vec<RowValues>>, SqlServerError> {
    page.iter()
        .map(|record| {
            if index > record.len() {
                return Err(SqlServerError::ParameterError(format!(
                    "add_dtm_column_index {index} is out of range for a record of {} values",
                    record.len()
                )));
            }
            let mut stamped = Vec::with_capacity(record.len() + 1);
            stamped.extend_from_slice(&record[..index]);
            stamped.push(RowValues::Timestamp(stamp));
            stamped.extend_from_slice(&record[index..]);
            Ok(stamped)
        })
        .collect()
}
