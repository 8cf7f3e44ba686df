//! Thin async helpers over [tiberius] for SQL Server.
//!
//! Open a [`SqlServer`] from [`SqlServerOptions`], then run statements with
//! [`SqlServer::do_query`], page through ordered queries, bulk-insert records
//! or mirror one table into another. The wire protocol and authentication stay
//! with the driver; this crate only builds SQL, binds [`RowValues`] and
//! materializes rows.
//!
//! ```no_run
//! use sqlserver_helpers::prelude::*;
//!
//! # async fn run() -> Result<(), SqlServerError> {
//! let mut db = SqlServerOptions::builder(
//!     "db01".into(),
//!     "metrics".into(),
//!     "svc_reader".into(),
//!     "secret".into(),
//! )
//! .connect()
//! .await?;
//!
//! let rows = db.do_query("SELECT 1", QueryOptions::default()).await?;
//! assert_eq!(rows.results[0].get_by_index(0), Some(&RowValues::Int(1)));
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data_helper;
pub mod error;
pub mod prelude;
pub mod results;
pub mod sqlserver;
pub mod statements;
pub mod translation;
pub mod types;

pub use config::{SqlServerOptions, SqlServerOptionsBuilder};
pub use error::SqlServerError;
pub use results::{DbRow, ResultSet};
pub use sqlserver::{MirrorOptions, QueryOptions, QueryParams, SqlServer, WriteOptions};
pub use translation::translate_placeholders;
pub use types::RowValues;
