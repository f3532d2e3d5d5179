//! sqldb-bridge - query bridge between a dashboard host and its backends.
//!
//! Host query documents are translated into either raw-query requests against
//! a Hawkular-style metrics API or `;`-separated SQL batches run on MySQL,
//! Postgres or SQLite. Both kinds of result come back in one envelope.

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod logging;
pub mod query;
pub mod tsdb;

pub use config::{Config, DatasourceConfig};
pub use error::{BridgeError, Result};
pub use handler::{handle_sql_request, handle_sql_request_with, SqlResponse};
pub use query::{QueryExecutor, QueryPayload, ResultEnvelope, TimeRange};
