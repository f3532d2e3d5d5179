//! SQLite database client implementation.
//!
//! SQLite is addressed by file path (or `:memory:`) rather than host and port.
//! Values are converted by their runtime storage class, since column
//! declarations in SQLite are advisory.

use crate::db::{map_connection_error, ConnectionConfig, DatabaseClient, StatementResult, Value};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a single-connection pool on the configured database file.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.database))
            .map_err(|e| BridgeError::invalid_config(format!("database: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Opened sqlite database {}", config.database);
        Ok(Self { pool })
    }

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
impl DatabaseClient for SqliteClient {
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::statement_failed(sql, e.to_string()))?;

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

fn convert_row(row: &SqliteRow) -> std::result::Result<Vec<Value>, sqlx::Error> {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

fn convert_value(row: &SqliteRow, index: usize) -> std::result::Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_uppercase();

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Int(row.try_get(index)?),
        "REAL" => Value::Float(row.try_get(index)?),
        "BLOB" => Value::Bytes(row.try_get(index)?),
        _ => Value::String(row.try_get(index)?),
    };

    Ok(value)
}
