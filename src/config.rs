//! Configuration management for the bridge.
//!
//! Handles loading datasource definitions from TOML files. A datasource carries
//! the settings of both backends: the time-series HTTP endpoint and the
//! relational engine behind the SQL path.

use crate::db::{ConnectionConfig, Dialect};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Header carrying the tenant id when none is configured.
pub const DEFAULT_TENANT_HEADER: &str = "Hawkular-Tenant";

/// Default timeout for time-series requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for opening a database connection.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named datasources.
    #[serde(default)]
    pub datasources: HashMap<String, DatasourceConfig>,
}

/// Settings of one datasource as handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceConfig {
    /// Base URL of the time-series API (e.g. `http://host:8080/hawkular/metrics`).
    pub url: Option<String>,

    /// Tenant sent with every time-series request.
    pub tenant: Option<String>,

    /// Name of the tenant header.
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,

    /// Time-series request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Basic authentication forwarded to the time-series API.
    pub basic_auth: Option<BasicAuth>,

    /// Relational engine settings for the SQL path.
    #[serde(default)]
    pub sql: SqlConfig,

    /// Switches between legacy and corrected result naming.
    #[serde(default)]
    pub compat: CompatConfig,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            tenant: None,
            tenant_header: default_tenant_header(),
            timeout_secs: default_timeout_secs(),
            basic_auth: None,
            sql: SqlConfig::default(),
            compat: CompatConfig::default(),
        }
    }
}

impl DatasourceConfig {
    /// Time-series request timeout. Zero is raised to one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_tenant_header() -> String {
    DEFAULT_TENANT_HEADER.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Basic authentication credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Raw relational engine settings, validated by [`SqlConfig::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Dialect name: `mysql`, `postgres` or `sqlite`.
    pub dbms: Option<String>,

    /// Database host.
    pub host: Option<String>,

    /// Database port, kept as text the way hosts store it.
    pub port: Option<String>,

    /// Database name, or the file path for SQLite.
    pub database: Option<String>,

    /// Database user.
    pub user: Option<String>,

    /// Database password.
    pub password: Option<String>,

    /// Require TLS (Postgres only).
    #[serde(default)]
    pub ssl: bool,

    /// Timeout for opening the connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            dbms: None,
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            ssl: false,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Legacy naming behaviour. Both flags default to the historical output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompatConfig {
    /// Store every time-series result under the key `"A"`.
    #[serde(default = "default_true")]
    pub fixed_ref_id: bool,

    /// Name every SQL series `table_1`.
    #[serde(default = "default_true")]
    pub fixed_table_name: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            fixed_ref_id: true,
            fixed_table_name: true,
        }
    }
}

impl SqlConfig {
    /// Validates the settings and produces an immutable connection config.
    ///
    /// `dbms` is always required. Network dialects also need `host` and
    /// `port`; SQLite needs `database`, which holds the file path.
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let dbms = required("dbms", self.dbms.as_deref())?;
        let dialect = Dialect::parse(dbms)
            .ok_or_else(|| BridgeError::UnsupportedDialect(dbms.to_string()))?;

        let (host, port) = if dialect.is_network() {
            let host = required("host", self.host.as_deref())?;
            let port = required("port", self.port.as_deref())?;
            let port = port.trim().parse::<u16>().map_err(|_| {
                BridgeError::invalid_config(format!("port: '{port}' is not a valid port"))
            })?;
            (host.to_string(), port)
        } else {
            required("database", self.database.as_deref())?;
            (String::new(), 0)
        };

        Ok(ConnectionConfig {
            dialect,
            host,
            port,
            database: self.database.clone().unwrap_or_default(),
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            ssl: self.ssl,
            connect_timeout_secs: self.connect_timeout_secs,
        })
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BridgeError::invalid_config(format!("missing field '{field}'"))),
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqldb-bridge")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BridgeError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named datasource, or the default datasource if name is None.
    pub fn get_datasource(&self, name: Option<&str>) -> Option<&DatasourceConfig> {
        let key = name.unwrap_or("default");
        self.datasources.get(key)
    }
}
