use crate::types::RowValues;

/// Page size used when none (or zero) is given.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Parameters for a single `do_query` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryParams {
    /// Run the SQL text as-is.
    #[default]
    None,
    /// Bind one parameter list.
    Single(Vec<RowValues>),
    /// Run the statement once per parameter list.
    Many(Vec<Vec<RowValues>>),
}

/// Per-call options for query paths.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub params: QueryParams,
    /// Commit the pending transaction after the statement succeeds.
    pub commit: bool,
    /// Rewrite `?` placeholders to `@Pn`.
    pub translate_placeholders: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            params: QueryParams::None,
            commit: false,
            translate_placeholders: true,
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub fn with_params(mut self, params: Vec<RowValues>) -> Self {
        self.params = QueryParams::Single(params);
        self
    }

    #[must_use]
    pub fn with_many(mut self, params: Vec<Vec<RowValues>>) -> Self {
        self.params = QueryParams::Many(params);
        self
    }

    #[must_use]
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }
}

/// Options for `write_records`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub page_size: usize,
    /// Insert the current local time as an `as_of_dtm` column.
    pub add_dtm_column: bool,
    pub add_dtm_column_index: usize,
    /// Truncate the table before writing.
    pub truncate: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            add_dtm_column: false,
            add_dtm_column_index: 0,
            truncate: false,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_dtm_column(mut self, index: usize) -> Self {
        self.add_dtm_column = true;
        self.add_dtm_column_index = index;
        self
    }

    #[must_use]
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    #[must_use]
    pub fn effective_page_size(&self) -> usize {
        effective_page_size(self.page_size)
    }
}

/// Options for `mirror_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Index into the source column list used for `ORDER BY`.
    pub order_by_column_index: usize,
    pub page_size: usize,
    pub add_dtm_column: bool,
    pub add_dtm_column_index: usize,
    pub order_by_desc: bool,
    /// Maximum number of rows to write.
    pub limit: Option<usize>,
    /// Truncate the destination table first.
    pub truncate: bool,
    /// Raw condition placed after `WHERE`; trusted input.
    pub where_conditional: Option<String>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            order_by_column_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            add_dtm_column: false,
            add_dtm_column_index: 0,
            order_by_desc: false,
            limit: None,
            truncate: true,
            where_conditional: None,
        }
    }
}

impl MirrorOptions {
    #[must_use]
    pub fn with_order_by(mut self, column_index: usize, descending: bool) -> Self {
        self.order_by_column_index = column_index;
        self.order_by_desc = descending;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_dtm_column(mut self, index: usize) -> Self {
        self.add_dtm_column = true;
        self.add_dtm_column_index = index;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    #[must_use]
    pub fn with_where(mut self, condition: impl Into<String>) -> Self {
        self.where_conditional = Some(condition.into());
        self
    }

    #[must_use]
    pub fn effective_page_size(&self) -> usize {
        effective_page_size(self.page_size)
    }
}

fn effective_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}
