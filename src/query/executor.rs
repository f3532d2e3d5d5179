//! Batch execution across both backends.
//!
//! A batch is a list of host query documents sharing one time range. Every
//! document is translated up front; the translated queries then run one at a
//! time and the first failure aborts the batch.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DatasourceConfig;
use crate::db::{execute_batch, Connector, DriverConnector, TableNaming, TableSeries};
use crate::error::{BridgeError, Result};
use crate::query::descriptor::{QueryDescriptor, TimeRange, TranslatedQuery};
use crate::tsdb::{TimeSeries, TsdbClient};

/// Key used for every result while `compat.fixed_ref_id` is set.
pub const FIXED_REF_ID: &str = "A";

/// Results of one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPayload {
    Series(Vec<TimeSeries>),
    Tables(Vec<TableSeries>),
}

/// Results of a batch, keyed by query reference.
pub type ResultEnvelope = BTreeMap<String, QueryPayload>;

/// Runs query batches against one datasource.
pub struct QueryExecutor {
    datasource: DatasourceConfig,
    tsdb: Option<TsdbClient>,
    connector: Box<dyn Connector>,
}

impl QueryExecutor {
    /// Creates an executor for the datasource.
    ///
    /// The HTTP client is only built when the datasource has a URL, so
    /// SQL-only datasources are accepted.
    pub fn new(datasource: DatasourceConfig) -> Result<Self> {
        let tsdb = match datasource.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(TsdbClient::new(&datasource)?),
            _ => None,
        };

        Ok(Self {
            datasource,
            tsdb,
            connector: Box::new(DriverConnector),
        })
    }

    /// Replaces how SQL connections are opened.
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Box::new(connector);
        self
    }

    /// Executes a batch of query documents over `range`.
    pub async fn execute(
        &self,
        documents: &[JsonValue],
        range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<ResultEnvelope> {
        info!("Executing batch of {} query(ies)", documents.len());

        let translated = documents
            .iter()
            .map(|doc| {
                let descriptor = QueryDescriptor::from_json(doc)?;
                debug!(metric = %descriptor.metric_summary(), "Translated query");
                let query = descriptor.translate(range)?;
                Ok((descriptor, query))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut envelope = ResultEnvelope::new();
        for (descriptor, query) in translated {
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }

            let payload = match query {
                TranslatedQuery::TimeSeries { query, metric_type } => {
                    let client = self.tsdb.as_ref().ok_or_else(|| {
                        BridgeError::request_build("datasource has no URL")
                    })?;
                    QueryPayload::Series(client.query(&query, &metric_type, cancel).await?)
                }
                TranslatedQuery::Sql(batch) => {
                    QueryPayload::Tables(self.run_sql(&batch, cancel).await?)
                }
            };

            envelope.insert(self.result_key(&descriptor), payload);
        }

        info!("Batch finished with {} result(s)", envelope.len());
        Ok(envelope)
    }

    fn result_key(&self, descriptor: &QueryDescriptor) -> String {
        if self.datasource.compat.fixed_ref_id {
            FIXED_REF_ID.to_string()
        } else {
            descriptor.ref_id.clone()
        }
    }

    /// Opens a connection, runs the batch and closes the connection again.
    async fn run_sql(&self, batch: &str, cancel: &CancellationToken) -> Result<Vec<TableSeries>> {
        let config = self.datasource.sql.resolve()?;
        debug!("Opening {}", config.display_string());

        let client = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            client = self.connector.connect(&config) => client?,
        };

        let naming = TableNaming::from_compat(self.datasource.compat.fixed_table_name);
        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            series = execute_batch(client.as_ref(), batch, naming) => series,
        };

        client.close().await;
        result
    }
}
