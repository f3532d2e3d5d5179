//! Integration tests for sqldb-bridge.

pub mod connection_test;
pub mod sql_test;
pub mod tsdb_test;
