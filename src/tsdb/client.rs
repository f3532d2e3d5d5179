//! Time-series HTTP client.

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DatasourceConfig;
use crate::error::{BridgeError, Result};
use crate::tsdb::{build_request, read_response, MetricType, TimeSeries, TsdbEndpoint, TsdbQuery};

/// Sends raw queries to one metrics endpoint.
#[derive(Debug, Clone)]
pub struct TsdbClient {
    endpoint: TsdbEndpoint,
    client: Client,
}

impl TsdbClient {
    /// Creates a client for the datasource's URL, tenant and credentials.
    pub fn new(config: &DatasourceConfig) -> Result<Self> {
        let endpoint = TsdbEndpoint::from_config(config)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                BridgeError::request_build(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { endpoint, client })
    }

    /// Runs one raw query and returns the decoded series.
    ///
    /// The request and the body read both race against `cancel`; when it
    /// fires first the in-flight response is dropped and `Cancelled` returned.
    pub async fn query(
        &self,
        query: &TsdbQuery,
        metric_type: &MetricType,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeSeries>> {
        let request = build_request(&self.client, &self.endpoint, query, metric_type)?;
        debug!("POST {}", request.url());

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("Time-series query cancelled");
                Err(BridgeError::Cancelled)
            }
            result = self.send(request) => result,
        }
    }

    async fn send(&self, request: reqwest::Request) -> Result<Vec<TimeSeries>> {
        let response = self.client.execute(request).await.map_err(|e| {
            warn!("Time-series request failed: {}", e);
            if e.is_timeout() {
                BridgeError::connection("Request timed out")
            } else if e.is_connect() {
                BridgeError::connection(format!(
                    "Failed to connect to {}: {}",
                    self.endpoint.base_url, e
                ))
            } else {
                BridgeError::connection(format!("Request failed: {}", e))
            }
        })?;

        read_response(response).await
    }
}
