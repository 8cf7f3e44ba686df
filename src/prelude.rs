//! Convenient imports for common functionality.
//!
//! ```rust
//! use sqlserver_helpers::prelude::*;
//! ```

pub use crate::config::{SqlServerOptions, SqlServerOptionsBuilder};
pub use crate::data_helper;
pub use crate::error::SqlServerError;
pub use crate::results::{DbRow, ResultSet};
pub use crate::sqlserver::{MirrorOptions, QueryOptions, QueryParams, SqlServer, WriteOptions};
pub use crate::types::RowValues;
