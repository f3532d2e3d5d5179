//! Multi-statement execution and row arrangement.
//!
//! A batch is a `;`-separated string. Statements run one after another on the
//! same client, without a transaction; the first failure aborts the batch and
//! nothing that ran before it is reported.

use crate::db::{DatabaseClient, StatementResult, TableSeries, Value};
use crate::error::{BridgeError, Result};
use tracing::{debug, warn};

/// How series produced by a batch are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableNaming {
    /// Every series is called `table_1`, whatever its position.
    #[default]
    Fixed,
    /// Series are called `table_N` after the statement ordinal.
    Ordinal,
}

impl TableNaming {
    /// Picks the naming from the `fixed_table_name` compat flag.
    pub fn from_compat(fixed_table_name: bool) -> Self {
        if fixed_table_name {
            Self::Fixed
        } else {
            Self::Ordinal
        }
    }

    /// Returns the series name for the 1-based statement ordinal.
    pub fn name(&self, ordinal: usize) -> String {
        match self {
            Self::Fixed => "table_1".to_string(),
            Self::Ordinal => format!("table_{ordinal}"),
        }
    }
}

/// Splits a batch into statements, dropping segments that are blank.
pub fn split_statements(query: &str) -> Vec<&str> {
    query
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Executes every statement of `query` in order and arranges each result.
///
/// Returns one series per non-blank statement. A failing statement yields
/// `QueryExecution` carrying its 1-based ordinal.
pub async fn execute_batch(
    client: &dyn DatabaseClient,
    query: &str,
    naming: TableNaming,
) -> Result<Vec<TableSeries>> {
    let statements = split_statements(query);
    debug!("Executing batch of {} statement(s)", statements.len());

    let mut series = Vec::with_capacity(statements.len());
    for (i, statement) in statements.iter().enumerate() {
        let ordinal = i + 1;
        let result = client
            .execute_statement(statement)
            .await
            .map_err(|e| at_position(e, ordinal, statement))?;

        series.push(arrange_result(result, naming.name(ordinal))?);
    }

    Ok(series)
}

fn at_position(error: BridgeError, position: usize, statement: &str) -> BridgeError {
    warn!("Statement {} failed: {}", position, error);
    match error {
        BridgeError::QueryExecution { message, .. } => BridgeError::QueryExecution {
            position,
            statement: statement.to_string(),
            message,
        },
        BridgeError::Cancelled => BridgeError::Cancelled,
        other => BridgeError::QueryExecution {
            position,
            statement: statement.to_string(),
            message: other.to_string(),
        },
    }
}

/// Arranges a raw statement result into a named series.
///
/// Every row must have exactly one value per declared column. Byte blobs are
/// turned into text; all other values are kept as the driver produced them.
pub fn arrange_result(result: StatementResult, name: String) -> Result<TableSeries> {
    let expected = result.columns.len();
    let mut values: Vec<Vec<Value>> = Vec::with_capacity(result.rows.len());

    for (i, row) in result.rows.into_iter().enumerate() {
        if row.len() != expected {
            return Err(BridgeError::RowShape {
                row: i + 1,
                expected,
                actual: row.len(),
            });
        }
        values.push(row.into_iter().map(|v| v.into_text_if_bytes()).collect());
    }

    Ok(TableSeries {
        columns: result.columns,
        name,
        values,
    })
}
