//! SQL path integration tests.
//!
//! Runs full batches through the request handler and the executor against
//! SQLite files and in-memory databases.

use pretty_assertions::assert_eq;
use serde_json::json;
use sqldb_bridge::config::{CompatConfig, Config, DatasourceConfig, SqlConfig};
use sqldb_bridge::db::Value;
use sqldb_bridge::{handle_sql_request, QueryExecutor, QueryPayload, TimeRange};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn sqlite(database: &str) -> DatasourceConfig {
    DatasourceConfig {
        sql: SqlConfig {
            dbms: Some("sqlite".to_string()),
            database: Some(database.to_string()),
            ..SqlConfig::default()
        },
        ..DatasourceConfig::default()
    }
}

/// Creates a database file with a small metrics table.
async fn seeded_database(dir: &TempDir) -> String {
    let path = dir.path().join("metrics.db");
    std::fs::File::create(&path).unwrap();
    let path = path.to_string_lossy().into_owned();

    let response = handle_sql_request(
        &sqlite(&path),
        json!({
            "query": "CREATE TABLE samples (id INTEGER, host TEXT, value REAL, raw BLOB);
                      INSERT INTO samples VALUES (1, 'a', 0.5, X'6869');
                      INSERT INTO samples VALUES (2, 'b', 1.5, NULL);"
        })
        .to_string()
        .as_bytes(),
    )
    .await;
    assert_eq!(response.status.as_u16(), 200, "{}", response.body);

    path
}

#[tokio::test]
async fn test_handler_reads_seeded_rows() {
    let dir = TempDir::new().unwrap();
    let path = seeded_database(&dir).await;

    let response = handle_sql_request(
        &sqlite(&path),
        br#"{"query": "SELECT id, host, value, raw FROM samples ORDER BY id"}"#,
    )
    .await;

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(
        response.body,
        json!({
            "results": [{
                "series": [{
                    "columns": ["id", "host", "value", "raw"],
                    "name": "table_1",
                    "values": [[1, "a", 0.5, "hi"], [2, "b", 1.5, null]]
                }]
            }]
        })
    );
}

#[tokio::test]
async fn test_side_effects_of_failed_batch_persist() {
    let dir = TempDir::new().unwrap();
    let path = seeded_database(&dir).await;
    let ds = sqlite(&path);

    let response = handle_sql_request(
        &ds,
        br#"{"query": "INSERT INTO samples VALUES (3, 'c', 2.5, NULL); SELECT * FROM missing"}"#,
    )
    .await;
    assert_eq!(response.status.as_u16(), 500);
    assert!(response.body.get("results").is_none());

    // Statements are not wrapped in a transaction.
    let response =
        handle_sql_request(&ds, br#"{"query": "SELECT COUNT(*) AS n FROM samples"}"#).await;
    assert_eq!(response.body["results"][0]["series"][0]["values"], json!([[3]]));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let dir = TempDir::new().unwrap();
    let path = seeded_database(&dir).await;

    let response = handle_sql_request(
        &sqlite(&path),
        br#"{"query": "SELECT id, host FROM samples WHERE id > 100"}"#,
    )
    .await;

    let series = &response.body["results"][0]["series"][0];
    assert_eq!(series["columns"], json!(["id", "host"]));
    assert_eq!(series["values"], json!([]));
}

#[tokio::test]
async fn test_executor_from_config_file() {
    let dir = TempDir::new().unwrap();
    let db_path = seeded_database(&dir).await;
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[datasources.default.sql]
dbms = "sqlite3"
database = "{}"

[datasources.default.compat]
fixed_ref_id = false
fixed_table_name = false
"#,
            db_path.replace('\\', "\\\\")
        ),
    )
    .unwrap();

    let config = Config::load_from_file(&config_path).unwrap();
    let datasource = config.get_datasource(None).unwrap().clone();
    assert_eq!(
        datasource.compat,
        CompatConfig {
            fixed_ref_id: false,
            fixed_table_name: false
        }
    );

    let executor = QueryExecutor::new(datasource).unwrap();
    let envelope = executor
        .execute(
            &[json!({
                "refId": "hosts",
                "rawQuery": true,
                "query": "SELECT host FROM samples WHERE id = 1; SELECT MAX(value) FROM samples"
            })],
            &TimeRange::new(0, 60_000).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    match &envelope["hosts"] {
        QueryPayload::Tables(tables) => {
            assert_eq!(tables.len(), 2);
            assert_eq!(tables[0].name, "table_1");
            assert_eq!(tables[0].values, vec![vec![Value::String("a".into())]]);
            assert_eq!(tables[1].name, "table_2");
            assert_eq!(tables[1].values, vec![vec![Value::Float(1.5)]]);
        }
        other => panic!("Expected tables, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_dialect() {
    let mut ds = sqlite(":memory:");
    ds.sql.dbms = Some("oracle".to_string());

    let response = handle_sql_request(&ds, br#"{"query": "SELECT 1"}"#).await;

    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(response.body["message"], "Unable to open SQL connection");
    assert_eq!(response.body["error"], "Unknown DBMS: oracle");
}
