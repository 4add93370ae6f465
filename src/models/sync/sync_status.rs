//! Row counts per replicated table plus recent run history.

use super::sync_log_entry::SyncLogEntry;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TableStatus {
    pub table: String,
    /// `None` when the side could not be queried.
    pub primary_count: Option<i64>,
    pub secondary_count: Option<i64>,
    pub in_sync: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub tables: Vec<TableStatus>,
    pub recent_syncs: Vec<SyncLogEntry>,
}
