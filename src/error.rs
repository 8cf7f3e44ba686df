use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlServerError {
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// A page of a bulk write failed; `start..end` indexes the caller's records.
    #[error("Failed to write records[{start}:{end}] to database {database}: {source}")]
    Batch {
        start: usize,
        end: usize,
        database: String,
        #[source]
        source: Box<SqlServerError>,
    },

    /// Failure of a public helper operation, tagged with the server it ran against.
    #[error("{op}(): SqlServer {target}, db {database} failed{context}: {source}")]
    Operation {
        op: &'static str,
        target: String,
        database: String,
        context: String,
        #[source]
        source: Box<SqlServerError>,
    },
}

impl SqlServerError {
    /// Innermost error, skipping `Operation` and `Batch` context layers.
    #[must_use]
    pub fn root(&self) -> &SqlServerError {
        match self {
            SqlServerError::Operation { source, .. } | SqlServerError::Batch { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    #[must_use]
    pub fn is_parameter_error(&self) -> bool {
        matches!(self.root(), SqlServerError::ParameterError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_message_carries_target_and_cause() {
        let err = SqlServerError::Operation {
            op: "do_query",
            target: "db01,1433".to_string(),
            database: "metrics".to_string(),
            context: " while doing query `SELECT 1`".to_string(),
            source: Box::new(SqlServerError::ExecutionError("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "do_query(): SqlServer db01,1433, db metrics failed while doing query `SELECT 1`: SQL execution error: boom"
        );
    }

    #[test]
    fn root_unwraps_nested_context() {
        let err = SqlServerError::Operation {
            op: "write_records",
            target: "db01,1433".to_string(),
            database: "metrics".to_string(),
            context: String::new(),
            source: Box::new(SqlServerError::Batch {
                start: 100,
                end: 200,
                database: "metrics".to_string(),
                source: Box::new(SqlServerError::ParameterError("bad".to_string())),
            }),
        };
        assert!(err.is_parameter_error());
        assert!(err.to_string().contains("records[100:200]"));
    }
}
