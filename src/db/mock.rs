//! Mock database client for testing.
//!
//! Records every statement it receives and answers from a script, so the batch
//! engine can be exercised without a database server.

use super::{ConnectionConfig, Connector, DatabaseClient, StatementResult, Value};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock database client that returns predefined results.
#[derive(Default)]
pub struct MockDatabaseClient {
    scripted: Mutex<VecDeque<Result<StatementResult>>>,
    executed: Mutex<Vec<String>>,
    closed: AtomicBool,
    delay: Option<Duration>,
}

impl MockDatabaseClient {
    /// Creates a mock that answers every statement with a default result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer for the next unscripted statement.
    pub fn push_result(self, result: Result<StatementResult>) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
        self
    }

    /// Makes every statement take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The answer used when the script is exhausted: one row echoing the SQL.
    fn default_result(sql: &str) -> Result<StatementResult> {
        if sql.to_uppercase().starts_with("SELECT") {
            Ok(StatementResult::with_data(
                vec!["result".to_string()],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            ))
        } else {
            Ok(StatementResult::default())
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_statement(&self, sql: &str) -> Result<StatementResult> {
        if self.is_closed() {
            return Err(BridgeError::connection("mock connection is closed"));
        }

        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted.unwrap_or_else(|| Self::default_result(sql))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out one shared mock client, or fails every connection attempt.
#[derive(Default)]
pub struct MockConnector {
    client: Arc<MockDatabaseClient>,
    refuse: bool,
    attempts: AtomicUsize,
}

impl MockConnector {
    /// Creates a connector answering every `connect` with `client`.
    pub fn new(client: Arc<MockDatabaseClient>) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// Creates a connector whose every `connect` fails with a connection error.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Returns how many times `connect` was called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(BridgeError::connection(format!(
                "Cannot connect to {}. Check that the server is running.",
                config.display_string()
            )));
        }
        Ok(Box::new(Arc::clone(&self.client)))
    }
}
