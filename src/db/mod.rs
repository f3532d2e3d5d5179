//! Database abstraction layer for the SQL path.
//!
//! Provides a trait-based interface for statement execution, allowing the
//! MySQL, Postgres and SQLite backends to be used interchangeably, plus the
//! batch engine that arranges their row sets into table series.

pub mod engine;
mod mock;
mod mysql;
mod postgres;
mod sqlite;
mod types;

pub use engine::{arrange_result, execute_batch, split_statements, TableNaming};
pub use mock::{MockConnector, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{StatementResult, TableSeries, Value};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Returns the dialect as its configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a dialect from its configuration name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns true for dialects reached over host and port.
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Sqlite)
    }
}

/// Resolved, immutable connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    /// Database name, or the file path for SQLite.
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub connect_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Builds the dialect-specific data source name.
    pub fn dsn(&self) -> String {
        self.format_dsn(&self.password)
    }

    /// Returns the data source name with the password masked, for logs.
    pub fn display_string(&self) -> String {
        if self.password.is_empty() {
            self.dsn()
        } else {
            self.format_dsn("***")
        }
    }

    fn format_dsn(&self, password: &str) -> String {
        match self.dialect {
            Dialect::MySql => format!(
                "{}:{}@tcp({}:{})/{}?charset=utf8",
                self.user, password, self.host, self.port, self.database
            ),
            Dialect::Postgres => format!(
                "user={} password={} host={} port={} dbname={} sslmode={}",
                self.user,
                password,
                self.host,
                self.port,
                self.database,
                self.ssl_mode()
            ),
            Dialect::Sqlite => format!("file:{}", self.database),
        }
    }

    /// Returns the Postgres `sslmode` derived from the TLS flag.
    pub fn ssl_mode(&self) -> &'static str {
        if self.ssl {
            "require"
        } else {
            "disable"
        }
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// Opens a database client for the dialect of the given configuration.
///
/// The connection is established immediately so that unreachable hosts and
/// bad credentials fail here rather than on the first statement.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    tracing::debug!("Opening {} connection: {}", config.dialect.as_str(), config.display_string());
    match config.dialect {
        Dialect::MySql => Ok(Box::new(MySqlClient::connect(config).await?)),
        Dialect::Postgres => Ok(Box::new(PostgresClient::connect(config).await?)),
        Dialect::Sqlite => Ok(Box::new(SqliteClient::connect(config).await?)),
    }
}

/// Trait defining the interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes one statement and returns its column names and raw rows.
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult>;

    /// Closes the connection.
    async fn close(&self);
}

#[async_trait]
impl<T: DatabaseClient + ?Sized> DatabaseClient for Arc<T> {
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult> {
        (**self).execute_statement(sql).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Opens clients for resolved connection settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// Connects through the sqlx driver of the configured dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        connect(config).await
    }
}

/// Maps an sqlx connection error to a user-facing message.
pub(crate) fn map_connection_error(
    error: sqlx::Error,
    config: &ConnectionConfig,
) -> crate::error::BridgeError {
    use crate::error::BridgeError;

    let target = if config.dialect.is_network() {
        format!("{}:{}", config.host, config.port)
    } else {
        config.database.clone()
    };
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        BridgeError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("authentication failed") || error_str.contains("access denied") {
        BridgeError::connection(format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.user
        ))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        BridgeError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        BridgeError::connection(format!("{target}: {error}"))
    }
}
