use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tiberius::{AuthMethod, Config as TiberiusConfig};

use crate::error::SqlServerError;
use crate::sqlserver::SqlServer;

/// Port SQL Server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 1433;

/// Connection settings for a single SQL Server database.
///
/// Only SQL Server logins (username/password) are supported; integrated or
/// Kerberos authentication is left to the driver and not exposed here.
#[derive(Clone, Deserialize)]
pub struct SqlServerOptions {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Accept the server certificate without validation.
    #[serde(default = "default_trust_cert")]
    pub trust_cert: bool,
    /// When false, statements run inside implicit transactions that must be
    /// committed, matching ODBC's default behaviour.
    #[serde(default)]
    pub autocommit: bool,
    #[serde(default)]
    pub application_name: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_trust_cert() -> bool {
    true
}

impl fmt::Debug for SqlServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlServerOptions")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("instance_name", &self.instance_name)
            .field("trust_cert", &self.trust_cert)
            .field("autocommit", &self.autocommit)
            .field("application_name", &self.application_name)
            .finish()
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    sql_server: Option<SqlServerOptions>,
}

impl SqlServerOptions {
    #[must_use]
    pub fn new(server: String, database: String, username: String, password: String) -> Self {
        Self {
            server,
            database,
            username,
            password,
            port: DEFAULT_PORT,
            instance_name: None,
            trust_cert: true,
            autocommit: false,
            application_name: None,
        }
    }

    #[must_use]
    pub fn builder(
        server: String,
        database: String,
        username: String,
        password: String,
    ) -> SqlServerOptionsBuilder {
        SqlServerOptionsBuilder {
            opts: Self::new(server, database, username, password),
        }
    }

    /// Parse a JSON document of the form `{ "sql_server": { ... } }`.
    ///
    /// # Errors
    /// Returns `SqlServerError::ConfigError` if the document is malformed, the
    /// `sql_server` section is missing, or a required field is absent.
    pub fn from_json_str(contents: &str) -> Result<Self, SqlServerError> {
        let file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| SqlServerError::ConfigError(format!("invalid config: {e}")))?;
        file.sql_server.ok_or_else(|| {
            SqlServerError::ConfigError("config has no `sql_server` section".to_string())
        })
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    /// Returns `SqlServerError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlServerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SqlServerError::ConfigError(format!("could not read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Override fields from `SQLSERVER_HOST`, `SQLSERVER_PORT`,
    /// `SQLSERVER_DATABASE`, `SQLSERVER_USERNAME` and `SQLSERVER_PASSWORD`.
    ///
    /// # Errors
    /// Returns `SqlServerError::ConfigError` if `SQLSERVER_PORT` is not a valid port.
    pub fn apply_env_overrides(self) -> Result<Self, SqlServerError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Like [`SqlServerOptions::apply_env_overrides`], reading values from `lookup`.
    ///
    /// # Errors
    /// Returns `SqlServerError::ConfigError` if the port value is not a valid port.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, SqlServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup("SQLSERVER_HOST") {
            self.server = server;
        }
        if let Some(port) = lookup("SQLSERVER_PORT") {
            self.port = port.trim().parse().map_err(|e| {
                SqlServerError::ConfigError(format!("SQLSERVER_PORT={port} is not a valid port: {e}"))
            })?;
        }
        if let Some(database) = lookup("SQLSERVER_DATABASE") {
            self.database = database;
        }
        if let Some(username) = lookup("SQLSERVER_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("SQLSERVER_PASSWORD") {
            self.password = password;
        }
        Ok(self)
    }

    /// `server,port`, the target form used in connection strings and error messages.
    #[must_use]
    pub fn display_target(&self) -> String {
        format!("{},{}", self.server, self.port)
    }

    /// Build the driver configuration for these options.
    #[must_use]
    pub fn tiberius_config(&self) -> TiberiusConfig {
        let mut config = TiberiusConfig::new();
        config.host(&self.server);
        config.port(self.port);
        config.database(&self.database);
        config.authentication(AuthMethod::sql_server(&self.username, &self.password));
        if let Some(instance) = &self.instance_name {
            config.instance_name(instance);
        }
        if let Some(app) = &self.application_name {
            config.application_name(app);
        }
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }
}

/// Fluent builder for [`SqlServerOptions`].
#[derive(Debug, Clone)]
pub struct SqlServerOptionsBuilder {
    opts: SqlServerOptions,
}

impl SqlServerOptionsBuilder {
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.opts.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.opts.autocommit = autocommit;
        self
    }

    #[must_use]
    pub fn application_name(mut self, application_name: Option<String>) -> Self {
        self.opts.application_name = application_name;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqlServerOptions {
        self.opts
    }

    /// Connect with the built options.
    ///
    /// # Errors
    ///
    /// Returns `SqlServerError` if the connection cannot be established.
    pub async fn connect(self) -> Result<SqlServer, SqlServerError> {
        SqlServer::connect(self.finish()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_fill_optional_fields() {
        let opts = SqlServerOptions::from_json_str(
            r#"{"sql_server": {"server": "db01", "database": "metrics", "username": "svc", "password": "pw"}}"#,
        )
        .unwrap();
        assert_eq!(opts.port, DEFAULT_PORT);
        assert!(opts.trust_cert);
        assert!(!opts.autocommit);
        assert_eq!(opts.display_target(), "db01,1433");
    }

    #[test]
    fn missing_section_or_field_is_config_error() {
        let err = SqlServerOptions::from_json_str(r#"{"other": {}}"#).unwrap_err();
        assert!(matches!(err, SqlServerError::ConfigError(_)));
        let err = SqlServerOptions::from_json_str(r#"{"sql_server": {"server": "db01"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn overrides_replace_values_and_validate_port() {
        let base = SqlServerOptions::new("a".into(), "b".into(), "c".into(), "d".into());
        let opts = base
            .clone()
            .apply_overrides(|key| match key {
                "SQLSERVER_HOST" => Some("db02".to_string()),
                "SQLSERVER_PORT" => Some("14330".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(opts.display_target(), "db02,14330");
        assert_eq!(opts.database, "b");

        let err = base
            .apply_overrides(|key| (key == "SQLSERVER_PORT").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, SqlServerError::ConfigError(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let opts = SqlServerOptions::builder("a".into(), "b".into(), "c".into(), "hunter2".into())
            .port(1500)
            .autocommit(true)
            .finish();
        let rendered = format!("{opts:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("1500"));
    }

    #[test]
    fn driver_config_targets_host_and_port() {
        let opts = SqlServerOptions::builder("db01".into(), "m".into(), "u".into(), "p".into())
            .port(1500)
            .finish();
        assert_eq!(opts.tiberius_config().get_addr(), "db01:1500");
    }
}
