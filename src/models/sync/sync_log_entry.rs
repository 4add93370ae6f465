//! Summary of one full sync run, kept in memory.

use super::table_sync_result::TableSyncResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables_succeeded: usize,
    pub tables_failed: usize,
    pub total_rows: u64,
    /// `table: error` for every failed table.
    pub errors: Vec<String>,
}

impl SyncLogEntry {
    pub fn from_results(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: &[TableSyncResult],
    ) -> Self {
        let tables_succeeded = results.iter().filter(|r| r.success).count();
        Self {
            id: Uuid::new_v4(),
            started_at,
            finished_at,
            tables_succeeded,
            tables_failed: results.len() - tables_succeeded,
            total_rows: results.iter().map(|r| r.rows_synced).sum(),
            errors: results
                .iter()
                .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.table)))
                .collect(),
        }
    }
}

/// Result of [`crate::sync::Synchronizer::sync_all_tables`].
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub log: SyncLogEntry,
    pub results: Vec<TableSyncResult>,
}
