//! Row and series types for the SQL path.
//!
//! `StatementResult` is what a driver hands back for one statement;
//! `TableSeries` is the arranged, host-facing shape of the same data.

use serde::{Deserialize, Serialize};

/// Raw output of a single statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    /// Column names in declaration order.
    pub columns: Vec<String>,

    /// Positional row values.
    pub rows: Vec<Vec<Value>>,
}

impl StatementResult {
    /// Creates a statement result with the given columns and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// A named table of rows, one per executed statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableSeries {
    pub columns: Vec<String>,
    pub name: String,
    pub values: Vec<Vec<Value>>,
}

/// Represents a single value from a database query.
///
/// Serialized without a tag, so rows render as plain JSON scalars.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Replaces byte blobs with their text form; other values pass through.
    pub fn into_text_if_bytes(self) -> Self {
        match self {
            Value::Bytes(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
            other => other,
        }
    }
}
