// SQL Server helper - a single tiberius connection plus convenience operations
//
// - client: connect / close / commit / rollback
// - options: per-call options for queries, bulk writes and mirrors
// - params: binding RowValues onto tiberius queries
// - query: statement execution and result materialization
// - paginate: OFFSET/FETCH paging over ordered queries
// - bulk: truncate, write_records and mirror_table

mod bulk;
mod client;
mod options;
mod paginate;
mod params;
mod query;

use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use tracing::warn;

use crate::config::SqlServerOptions;
use crate::error::SqlServerError;

pub use options::{MirrorOptions, QueryOptions, QueryParams, WriteOptions};
pub use params::bind_query_params;

/// Type alias for the underlying tiberius client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// An open connection to one SQL Server database.
///
/// Every operation takes `&mut self`; statements on one connection never
/// overlap. Open a second `SqlServer` to read from one database while writing
/// to another.
pub struct SqlServer {
    client: MssqlClient,
    options: SqlServerOptions,
}

impl std::fmt::Debug for SqlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServer")
            .field("client", &"<MssqlClient>")
            .field("options", &self.options)
            .finish()
    }
}

impl SqlServer {
    #[must_use]
    pub fn options(&self) -> &SqlServerOptions {
        &self.options
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.options.database
    }

    /// Direct access to the driver client for anything these helpers do not cover.
    pub fn client_mut(&mut self) -> &mut MssqlClient {
        &mut self.client
    }

    fn operation_error(
        &self,
        op: &'static str,
        context: String,
        source: SqlServerError,
    ) -> SqlServerError {
        warn!(op, target = %self.options.display_target(), database = %self.options.database, error = %source, "operation failed");
        operation_error(&self.options, op, context, source)
    }
}

pub(crate) fn operation_error(
    options: &SqlServerOptions,
    op: &'static str,
    context: String,
    source: SqlServerError,
) -> SqlServerError {
    SqlServerError::Operation {
        op,
        target: options.display_target(),
        database: options.database.clone(),
        context,
        source: Box::new(source),
    }
}
