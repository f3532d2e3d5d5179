//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::db::{map_connection_error, ConnectionConfig, DatabaseClient, StatementResult, Value};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::debug;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a single-connection pool for the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = if config.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .ssl_mode(ssl_mode);
        if !config.user.is_empty() {
            options = options.username(&config.user);
        }
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to postgres at {}:{}", config.host, config.port);
        Ok(Self { pool })
    }

    /// Reads column names from the statement description when no row came back.
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult> {
        // Simple-query protocol: every value arrives in text format.
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::statement_failed(sql, format_query_error(e)))?;

        let columns = match rows.first() {
            Some(first) => first
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            None => self.describe_columns(sql).await,
        };

        let rows = rows
            .iter()
            .map(convert_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::statement_failed(sql, format!("cannot decode row: {e}")))?;

        Ok(StatementResult { columns, rows })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Converts a sqlx PgRow to positional values.
fn convert_row(row: &PgRow) -> std::result::Result<Vec<Value>, sqlx::Error> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Types without a native mapping (timestamps, dates, numeric, uuid, json,
/// arrays) keep the server's text rendering.
fn convert_value(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "INT2" | "SMALLINT" => Value::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" | "INT" | "INTEGER" => Value::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" | "BIGINT" => Value::Int(row.try_get(index)?),
        "FLOAT4" | "REAL" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" | "DOUBLE PRECISION" => Value::Float(row.try_get(index)?),
        "BYTEA" => Value::Bytes(row.try_get(index)?),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}

/// Formats a query error with the Postgres detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
