//! Entry point for raw SQL requests.
//!
//! The host posts `{"query": "<batch>"}`; the answer is either the arranged
//! series or an error message, always with a status code.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::config::DatasourceConfig;
use crate::db::{execute_batch, Connector, DriverConnector, TableNaming};
use crate::error::BridgeError;

/// Status and JSON body answering one SQL request.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl SqlResponse {
    fn error(status: StatusCode, message: String, error: &BridgeError) -> Self {
        Self {
            status,
            body: json!({
                "message": message,
                "error": error.to_string(),
                "kind": error.kind(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SqlRequest {
    #[serde(default)]
    query: String,
}

/// Handles one SQL request body against the datasource's database.
///
/// The connection is opened for this request only and closed before
/// returning.
pub async fn handle_sql_request(datasource: &DatasourceConfig, body: &[u8]) -> SqlResponse {
    handle_sql_request_with(&DriverConnector, datasource, body).await
}

/// Like [`handle_sql_request`], opening the connection through `connector`.
pub async fn handle_sql_request_with(
    connector: &dyn Connector,
    datasource: &DatasourceConfig,
    body: &[u8],
) -> SqlResponse {
    let request: SqlRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            let err = BridgeError::invalid_query(format!("request body is not valid JSON: {e}"));
            warn!("{}", err);
            return SqlResponse::error(StatusCode::BAD_REQUEST, err.to_string(), &err);
        }
    };

    let client = match datasource.sql.resolve() {
        Ok(config) => connector.connect(&config).await,
        Err(e) => Err(e),
    };
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            warn!("Unable to open SQL connection: {}", e);
            return SqlResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to open SQL connection".to_string(),
                &e,
            );
        }
    };

    let naming = TableNaming::from_compat(datasource.compat.fixed_table_name);
    let result = execute_batch(client.as_ref(), &request.query, naming).await;
    client.close().await;

    match result {
        Ok(series) => {
            info!("SQL request returned {} series", series.len());
            SqlResponse {
                status: StatusCode::OK,
                body: json!({ "results": [{ "series": series }] }),
            }
        }
        Err(e) => {
            warn!("SQL request failed: {}", e);
            SqlResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Data error: {}, Query: {}", e, request.query),
                &e,
            )
        }
    }
}
