use super::SqlServer;
use super::options::QueryOptions;
use crate::error::SqlServerError;
use crate::results::ResultSet;
use crate::statements::paginated_sql;

impl SqlServer {
    /// Fetch one page of an ordered query.
    ///
    /// Returns the page and the index to pass in for the next page. An empty
    /// page means the query is exhausted.
    ///
    /// ```no_run
    /// # use sqlserver_helpers::prelude::*;
    /// # async fn demo(db: &mut SqlServer) -> Result<(), SqlServerError> {
    /// let mut index = 0;
    /// loop {
    ///     let (page, next) = db
    ///         .do_query_paginated("SELECT id FROM dbo.t ORDER BY id", index, 100, QueryOptions::default())
    ///         .await?;
    ///     if page.is_empty() {
    ///         break;
    ///     }
    ///     index = next;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` wrapping a `ParameterError` when the
    /// query has no `ORDER BY` or `page_size` is zero, or the driver error.
    pub async fn do_query_paginated(
        &mut self,
        sql: &str,
        index: usize,
        page_size: usize,
        options: QueryOptions,
    ) -> Result<(ResultSet, usize), SqlServerError> {
        match self.paginated(sql, index, page_size, &options).await {
            Ok(page) => Ok(page),
            Err(e) => Err(self.operation_error(
                "do_query_paginated",
                format!(" (index={index}, page_size={page_size}) while doing query `{sql}`"),
                e,
            )),
        }
    }

    pub(crate) async fn paginated(
        &mut self,
        sql: &str,
        index: usize,
        page_size: usize,
        options: &QueryOptions,
    ) -> Result<(ResultSet, usize), SqlServerError> {
        let paged = paginated_sql(sql, index, page_size)?;
        let rows = self.run_statement(&paged, options).await?;
        Ok((rows, index + page_size))
    }
}
