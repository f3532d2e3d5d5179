//! Connection integration tests.
//!
//! Tests dialect resolution, connectivity and error handling.

use sqldb_bridge::config::SqlConfig;
use sqldb_bridge::db::{self, Dialect};
use sqldb_bridge::BridgeError;

/// Helper to build a Postgres config from the environment.
fn postgres_from_env() -> Option<SqlConfig> {
    let host = std::env::var("POSTGRES_TEST_HOST").ok()?;
    Some(SqlConfig {
        dbms: Some("postgres".to_string()),
        host: Some(host),
        port: Some(std::env::var("POSTGRES_TEST_PORT").unwrap_or_else(|_| "5432".to_string())),
        database: std::env::var("POSTGRES_TEST_DB").ok(),
        user: std::env::var("POSTGRES_TEST_USER").ok(),
        password: std::env::var("POSTGRES_TEST_PASSWORD").ok(),
        ..SqlConfig::default()
    })
}

#[tokio::test]
async fn test_postgres_batch() {
    let Some(sql) = postgres_from_env() else {
        eprintln!("Skipping test: POSTGRES_TEST_HOST not set");
        return;
    };

    let config = sql.resolve().unwrap();
    let client = db::connect(&config).await.unwrap();
    let series = db::execute_batch(
        client.as_ref(),
        "SELECT 1 AS one; SELECT 'x'::bytea AS blob",
        db::TableNaming::Ordinal,
    )
    .await;
    client.close().await;

    let series = series.unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].values, vec![vec![db::Value::Int(1)]]);
    assert_eq!(series[1].values, vec![vec![db::Value::String("x".into())]]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let config = SqlConfig {
        dbms: Some("postgresql".to_string()),
        host: Some("invalid.host.that.does.not.exist.local".to_string()),
        port: Some("5432".to_string()),
        database: Some("testdb".to_string()),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
        connect_timeout_secs: 3,
        ..SqlConfig::default()
    }
    .resolve()
    .unwrap();
    assert_eq!(config.dialect, Dialect::Postgres);

    let result = db::connect(&config).await;
    assert!(matches!(result, Err(BridgeError::Connection(_))));
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_mysql_refused() {
    let config = SqlConfig {
        dbms: Some("mysql".to_string()),
        host: Some("127.0.0.1".to_string()),
        port: Some("1".to_string()),
        database: Some("testdb".to_string()),
        user: Some("root".to_string()),
        connect_timeout_secs: 3,
        ..SqlConfig::default()
    }
    .resolve()
    .unwrap();

    assert_eq!(config.dsn(), "root:@tcp(127.0.0.1:1)/testdb?charset=utf8");
    let result = db::connect(&config).await;
    assert!(matches!(result, Err(BridgeError::Connection(_))));
}

#[test]
fn test_resolution_errors() {
    let missing_port = SqlConfig {
        dbms: Some("mysql".to_string()),
        host: Some("db".to_string()),
        ..SqlConfig::default()
    };
    let err = missing_port.resolve().unwrap_err();
    assert!(matches!(err, BridgeError::InvalidConfig(_)));
    assert!(err.to_string().contains("port"));

    let unknown = SqlConfig {
        dbms: Some("db2".to_string()),
        host: Some("db".to_string()),
        port: Some("50000".to_string()),
        ..SqlConfig::default()
    };
    assert!(matches!(
        unknown.resolve().unwrap_err(),
        BridgeError::UnsupportedDialect(_)
    ));
}
