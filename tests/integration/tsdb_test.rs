//! Time-series path integration tests.
//!
//! A throwaway HTTP server stands in for the metrics backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqldb_bridge::config::{BasicAuth, CompatConfig, DatasourceConfig};
use sqldb_bridge::{BridgeError, QueryExecutor, QueryPayload, TimeRange};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Answers every connection with `status` and `body`, reporting each raw request.
async fn fake_backend(
    status: &'static str,
    body: &'static str,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    (format!("http://{addr}/hawkular/metrics/"), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).into_owned();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request_body(request: &str) -> serde_json::Value {
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

fn datasource(url: String) -> DatasourceConfig {
    DatasourceConfig {
        url: Some(url),
        tenant: Some("ops".to_string()),
        timeout_secs: 5,
        ..DatasourceConfig::default()
    }
}

const HEAP_SERIES: &str =
    r#"[{"id":"heap.used","data":[{"timestamp":1000,"value":10},{"timestamp":2000,"value":12}]}]"#;

#[tokio::test]
async fn test_tag_query_end_to_end() {
    let (url, mut requests) = fake_backend("200 OK", HEAP_SERIES).await;
    let executor = QueryExecutor::new(datasource(url)).unwrap();

    let envelope = executor
        .execute(
            &[json!({
                "refId": "B",
                "queryBy": "tags",
                "tags": [{"name": "heap", "value": "used"}, {"name": "host", "value": "a"}],
                "type": "gauge"
            })],
            &TimeRange::new(1_000, 5_000).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let request = requests.recv().await.unwrap();
    assert!(request.starts_with("POST /hawkular/metrics/gauges/raw/query "));
    assert!(request.to_lowercase().contains("hawkular-tenant: ops"));
    assert_eq!(
        request_body(&request),
        json!({"start": 1000, "end": 5000, "order": "ASC", "tags": "heap:used,host:a"})
    );

    // Results stay under the fixed key by default.
    match &envelope["A"] {
        QueryPayload::Series(series) => {
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].name, "heap.used");
            let values: Vec<f64> = series[0].points.iter().map(|p| p.value).collect();
            assert_eq!(values, vec![10.0, 12.0]);
        }
        other => panic!("Expected series, got {other:?}"),
    }
}

#[tokio::test]
async fn test_id_query_keyed_by_ref_id() {
    let (url, mut requests) = fake_backend("200 OK", "[]").await;
    let mut ds = datasource(url);
    ds.compat = CompatConfig {
        fixed_ref_id: false,
        fixed_table_name: true,
    };
    ds.basic_auth = Some(BasicAuth {
        user: "jdoe".to_string(),
        password: None,
    });
    let executor = QueryExecutor::new(ds).unwrap();

    let envelope = executor
        .execute(
            &[json!({"refId": "temp", "queryBy": "ids", "target": "sensor.temp", "type": "counter"})],
            &TimeRange::new(0, 10).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let request = requests.recv().await.unwrap();
    assert!(request.starts_with("POST /hawkular/metrics/counters/raw/query "));
    assert!(request.to_lowercase().contains("authorization: basic "));
    assert_eq!(request_body(&request)["ids"], json!(["sensor.temp"]));
    assert_eq!(envelope["temp"], QueryPayload::Series(vec![]));
}

#[tokio::test]
async fn test_backend_error_aborts_batch() {
    let (url, mut requests) = fake_backend("500 Internal Server Error", "boom").await;
    let executor = QueryExecutor::new(datasource(url)).unwrap();

    let err = executor
        .execute(
            &[
                json!({"target": "a", "type": "gauge"}),
                json!({"target": "b", "type": "gauge"}),
            ],
            &TimeRange::new(0, 10).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        BridgeError::BackendStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected BackendStatus, got {other:?}"),
    }

    // Only the first query was sent.
    assert!(requests.recv().await.is_some());
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let executor = QueryExecutor::new(datasource(format!("http://{addr}"))).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        executor.execute(
            &[json!({"target": "slow", "type": "gauge"})],
            &TimeRange::new(0, 10).unwrap(),
            &cancel,
        ),
    )
    .await
    .expect("cancellation did not interrupt the request");

    assert!(matches!(result, Err(BridgeError::Cancelled)));
}

#[tokio::test]
async fn test_undecodable_response() {
    let (url, _requests) = fake_backend("200 OK", r#"{"not": "an array"}"#).await;
    let executor = QueryExecutor::new(datasource(url)).unwrap();

    let err = executor
        .execute(
            &[json!({"target": "a", "type": "gauge"})],
            &TimeRange::new(0, 10).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "ResponseDecodeError");
}
