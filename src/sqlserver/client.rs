use tiberius::{Client, Config as TiberiusConfig, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::{debug, info};

use super::{MssqlClient, SqlServer, operation_error};
use crate::config::SqlServerOptions;
use crate::error::SqlServerError;

impl SqlServer {
    /// Open a connection described by `options`.
    ///
    /// Unless `autocommit` is set, the session runs with
    /// `IMPLICIT_TRANSACTIONS ON`, so writes stay pending until
    /// [`SqlServer::commit`] (or a `commit: true` query) and are rolled back
    /// by [`SqlServer::close`].
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` wrapping the resolve, TCP or login failure.
    pub async fn connect(options: SqlServerOptions) -> Result<Self, SqlServerError> {
        info!(target = %options.display_target(), database = %options.database, "connecting to SQL Server");

        let client = open_client(&options)
            .await
            .map_err(|e| operation_error(&options, "connect", " while initializing".to_string(), e))?;

        let mut server = SqlServer { client, options };
        if !server.options.autocommit {
            if let Err(e) = server.batch("SET IMPLICIT_TRANSACTIONS ON").await {
                return Err(server.operation_error(
                    "connect",
                    " while enabling implicit transactions".to_string(),
                    e,
                ));
            }
        }
        Ok(server)
    }

    /// Close the connection, rolling back any uncommitted work first.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if the rollback or close fails.
    pub async fn close(mut self) -> Result<(), SqlServerError> {
        if let Err(e) = self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await {
            return Err(self.operation_error("close", " while closing".to_string(), e));
        }
        let options = self.options;
        info!(target = %options.display_target(), database = %options.database, "closing SQL Server connection");
        self.client
            .close()
            .await
            .map_err(|e| operation_error(&options, "close", " while closing".to_string(), e.into()))
    }

    /// Commit the open transaction, if any.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if the server rejects the commit.
    pub async fn commit(&mut self) -> Result<(), SqlServerError> {
        match self.commit_pending().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.operation_error("commit", String::new(), e)),
        }
    }

    /// Roll back the open transaction, if any.
    ///
    /// # Errors
    /// Returns `SqlServerError::Operation` if the server rejects the rollback.
    pub async fn rollback(&mut self) -> Result<(), SqlServerError> {
        match self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.operation_error("rollback", String::new(), e)),
        }
    }

    pub(crate) async fn commit_pending(&mut self) -> Result<(), SqlServerError> {
        self.batch("IF @@TRANCOUNT > 0 COMMIT TRANSACTION").await
    }

    /// Send `sql` as a plain batch. Session settings such as `SET` must go
    /// this way: inside `sp_executesql` they are reverted when the call returns.
    pub(crate) async fn batch(&mut self, sql: &str) -> Result<(), SqlServerError> {
        debug!(database = %self.options.database, sql, "executing batch");
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

async fn open_client(options: &SqlServerOptions) -> Result<MssqlClient, SqlServerError> {
    let config = options.tiberius_config();
    let tcp = connect_tcp(&config, options).await?;

    match Client::connect(config, tcp.compat_write()).await {
        Ok(client) => Ok(client),
        // Azure SQL may redirect the login to another node
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(%host, port, "login routed to another server");
            let mut config = options.tiberius_config();
            config.host(&host);
            config.port(port);
            let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
                SqlServerError::ConnectionError(format!("TCP connection to {host},{port} failed: {e}"))
            })?;
            tcp.set_nodelay(true)?;
            Ok(Client::connect(config, tcp.compat_write()).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn connect_tcp(
    config: &TiberiusConfig,
    options: &SqlServerOptions,
) -> Result<TcpStream, SqlServerError> {
    if options.instance_name.is_some() {
        // Named instances are resolved through the SQL Browser service
        return TcpStream::connect_named(config).await.map_err(|e| {
            SqlServerError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        });
    }

    let server_addr = tokio::net::lookup_host((options.server.as_str(), options.port))
        .await
        .map_err(|e| {
            SqlServerError::ConnectionError(format!("Failed to resolve server address: {e}"))
        })?
        .next()
        .ok_or_else(|| {
            SqlServerError::ConnectionError(format!(
                "No valid address found for {}",
                options.server
            ))
        })?;

    let tcp = TcpStream::connect(server_addr)
        .await
        .map_err(|e| SqlServerError::ConnectionError(format!("TCP connection error: {e}")))?;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}
