//! Error types for the bridge.
//!
//! Defines the main error enum used by both the time-series and SQL paths.

use thiserror::Error;

/// Longest body snippet included in a rendered error message.
const BODY_SNIPPET_LEN: usize = 512;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A `tags` entry is missing its `name` or `value` string.
    #[error("Malformed tag at index {index}: missing or non-string '{field}'")]
    MalformedTag { index: usize, field: &'static str },

    /// The query document or time range cannot be used.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A required datasource setting is absent or unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured dialect has no entry in the dialect table.
    #[error("Unknown DBMS: {0}")]
    UnsupportedDialect(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement of a SQL batch failed.
    #[error("Statement {position} failed: {message} (statement: {statement})")]
    QueryExecution {
        position: usize,
        statement: String,
        message: String,
    },

    /// A driver row did not match the declared column list.
    #[error("Row {row} has {actual} values but {expected} columns were declared")]
    RowShape {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The time-series request could not be built.
    #[error("Failed to create request: {0}")]
    RequestBuild(String),

    /// The time-series backend answered with a non-2xx status.
    #[error("Request failed status: {status}: {}", snippet(.body))]
    BackendStatus { status: u16, body: String },

    /// The time-series backend answered with an undecodable body.
    #[error("Failed to decode response: {message}: {}", snippet(.body))]
    ResponseDecode { message: String, body: String },

    /// The governing cancellation token fired.
    #[error("Query cancelled")]
    Cancelled,
}

impl BridgeError {
    /// Creates an invalid query error with the given message.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Creates an invalid configuration error with the given message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a configuration file error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a statement failure; the batch engine fills in the position.
    pub fn statement_failed(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryExecution {
            position: 0,
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Creates a request build error with the given message.
    pub fn request_build(msg: impl Into<String>) -> Self {
        Self::RequestBuild(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedTag { .. } | Self::InvalidQuery(_) => "Query Error",
            Self::InvalidConfig(_) | Self::UnsupportedDialect(_) | Self::Config(_) => {
                "Configuration Error"
            }
            Self::Connection(_) => "Connection Error",
            Self::QueryExecution { .. } | Self::RowShape { .. } => "Data Error",
            Self::RequestBuild(_) | Self::BackendStatus { .. } | Self::ResponseDecode { .. } => {
                "Backend Error"
            }
            Self::Cancelled => "Cancelled",
        }
    }

    /// Returns a stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedTag { .. } => "MalformedTagError",
            Self::InvalidQuery(_) => "InvalidQueryError",
            Self::InvalidConfig(_) => "InvalidConfigError",
            Self::UnsupportedDialect(_) => "UnsupportedDialectError",
            Self::Config(_) => "ConfigError",
            Self::Connection(_) => "ConnectionError",
            Self::QueryExecution { .. } => "QueryExecutionError",
            Self::RowShape { .. } => "RowShapeError",
            Self::RequestBuild(_) => "RequestBuildError",
            Self::BackendStatus { .. } => "BackendStatusError",
            Self::ResponseDecode { .. } => "ResponseDecodeError",
            Self::Cancelled => "CancellationError",
        }
    }
}

fn snippet(body: &str) -> &str {
    if body.len() <= BODY_SNIPPET_LEN {
        return body;
    }
    let mut end = BODY_SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
