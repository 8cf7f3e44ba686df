use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Logs into a SQL Server and runs a basic query")]
pub(crate) struct Args {
    /// JSON config file with a `sql_server` section
    #[arg(long, default_value = "config.json")]
    pub(crate) config: PathBuf,
    #[arg(long, default_value = "SELECT 1")]
    pub(crate) query: String,
    #[arg(long, value_enum, default_value = "info")]
    pub(crate) log_level: LogLevel,
}
