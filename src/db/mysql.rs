//! MySQL database client implementation.

use crate::db::{map_connection_error, ConnectionConfig, DatabaseClient, StatementResult, Value};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::debug;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Opens a single-connection pool for the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .charset("utf8");
        if !config.user.is_empty() {
            options = options.username(&config.user);
        }
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to mysql at {}:{}", config.host, config.port);
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
impl DatabaseClient for MySqlClient {
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult> {
        // Text protocol: temporal and decimal values arrive as their SQL text.
        let rows = sqlx::raw_sql(sql)
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

fn convert_row(row: &MySqlRow) -> std::result::Result<Vec<Value>, sqlx::Error> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
///
/// Binary and blob columns stay as bytes here; the batch engine turns them
/// into text. DATETIME, DATE, TIME, DECIMAL and JSON keep the server's text.
fn convert_value(
    row: &MySqlRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOLEAN" => Value::Bool(row.try_get(index)?),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Value::Int(row.try_get(index)?),

        t if t.ends_with("UNSIGNED") => {
            let v: u64 = row.try_get(index)?;
            match i64::try_from(v) {
                Ok(signed) => Value::Int(signed),
                Err(_) => Value::String(v.to_string()),
            }
        }

        "FLOAT" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "DOUBLE" => Value::Float(row.try_get(index)?),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::Bytes(row.try_get_unchecked(index)?)
        }

        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}
