//! Outcome of replicating one table.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSyncResult {
    pub table: String,
    pub success: bool,
    pub rows_synced: u64,
    pub error: Option<String>,
}

impl TableSyncResult {
    pub fn ok(table: &str, rows_synced: u64) -> Self {
        Self {
            table: table.to_string(),
            success: true,
            rows_synced,
            error: None,
        }
    }

    pub fn failed(table: &str, error: impl ToString) -> Self {
        Self {
            table: table.to_string(),
            success: false,
            rows_synced: 0,
            error: Some(error.to_string()),
        }
    }
}
