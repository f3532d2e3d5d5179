//! Raw-query request construction.

use crate::config::{BasicAuth, DatasourceConfig};
use crate::error::{BridgeError, Result};
use crate::tsdb::{MetricType, TsdbQuery};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request};
use url::Url;

/// Where and as whom time-series requests are sent.
#[derive(Debug, Clone)]
pub struct TsdbEndpoint {
    pub base_url: Url,
    pub tenant_header: String,
    pub tenant: Option<String>,
    pub basic_auth: Option<BasicAuth>,
}

impl TsdbEndpoint {
    /// Extracts the endpoint from a datasource, validating the base URL.
    pub fn from_config(config: &DatasourceConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| BridgeError::request_build("datasource has no URL"))?;

        let base_url = Url::parse(raw.trim())
            .map_err(|e| BridgeError::request_build(format!("invalid URL '{raw}': {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(BridgeError::request_build(format!(
                "URL '{raw}' is not an http(s) base URL"
            )));
        }

        Ok(Self {
            base_url,
            tenant_header: config.tenant_header.clone(),
            tenant: config.tenant.clone().filter(|t| !t.is_empty()),
            basic_auth: config.basic_auth.clone(),
        })
    }

    /// Returns the raw-query URL for the given metric type.
    pub fn query_url(&self, metric_type: &MetricType) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}/raw/query",
            url.path().trim_end_matches('/'),
            metric_type.path_segment()
        );
        url.set_path(&path);
        url
    }
}

/// Builds the POST request carrying `query` as JSON.
pub fn build_request(
    client: &Client,
    endpoint: &TsdbEndpoint,
    query: &TsdbQuery,
    metric_type: &MetricType,
) -> Result<Request> {
    if metric_type.is_empty() {
        return Err(BridgeError::request_build("query has no metric type"));
    }

    let body = serde_json::to_vec(query)
        .map_err(|e| BridgeError::request_build(format!("cannot encode query: {e}")))?;

    let mut builder = client
        .post(endpoint.query_url(metric_type))
        .header(CONTENT_TYPE, "application/json")
        .body(body);

    if let Some(tenant) = &endpoint.tenant {
        builder = builder.header(endpoint.tenant_header.as_str(), tenant.as_str());
    }
    if let Some(auth) = &endpoint.basic_auth {
        builder = builder.basic_auth(&auth.user, auth.password.as_ref());
    }

    builder
        .build()
        .map_err(|e| BridgeError::request_build(e.to_string()))
}
