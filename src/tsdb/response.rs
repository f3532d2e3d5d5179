//! Raw-query response decoding.

use crate::error::{BridgeError, Result};
use crate::tsdb::{DataPoint, TimeSeries};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

/// One element of the backend's response array.
#[derive(Debug, Deserialize)]
struct BackendSeries {
    id: String,
    #[serde(rename = "data", default)]
    points: Vec<DataPoint>,
}

/// Reads the full body of `response` and parses it.
///
/// The response is consumed, so its connection is released whichever way
/// this returns.
pub async fn read_response(response: Response) -> Result<Vec<TimeSeries>> {
    let status = response.status();
    let body = response.text().await.map_err(|e| BridgeError::ResponseDecode {
        message: format!("failed to read response body: {e}"),
        body: String::new(),
    })?;

    parse_response(status, &body)
}

/// Turns a status and body into series.
///
/// Non-2xx statuses are reported as `BackendStatus` without looking at the body.
pub fn parse_response(status: StatusCode, body: &str) -> Result<Vec<TimeSeries>> {
    if !status.is_success() {
        warn!("Request failed, status: {}, body: {}", status, body);
        return Err(BridgeError::BackendStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let decoded: Vec<BackendSeries> = serde_json::from_str(body).map_err(|e| {
        warn!("Failed to decode response, status: {}, body: {}", status, body);
        BridgeError::ResponseDecode {
            message: e.to_string(),
            body: body.to_string(),
        }
    })?;

    Ok(decoded
        .into_iter()
        .map(|series| TimeSeries {
            name: series.id,
            points: series.points,
        })
        .collect())
}
