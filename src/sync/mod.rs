//! Primary → secondary replication.
//!
//! Full syncs copy every row of an allowlisted table and replace the
//! secondary's contents inside one transaction. Single-row operations can be
//! mirrored as they happen; those are best effort and report failure instead
//! of returning an error, so a secondary outage never undoes a primary write.

use crate::{
    db::{Row, Statement, connections::ConnectionManager, quote_ident, unwrap_json_rows},
    error::{Error, Result},
    models::sync::{
        schema_comparison::{ColumnInfo, SchemaStatus, TableSchemaComparison},
        sync_log_entry::{SyncLogEntry, SyncSummary},
        sync_operation::{SyncOp, SyncOperationResult},
        sync_status::{SyncStatus, TableStatus},
        table_sync_result::TableSyncResult,
    },
};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

pub mod scheduler;
pub mod schema;
pub mod tables;

use tables::{SYNC_TABLES, is_syncable};

/// Run summaries kept in memory.
const MAX_SYNC_LOG: usize = 50;
/// Run summaries returned by status reports.
pub const RECENT_SYNC_LOG: usize = 10;

pub struct Synchronizer {
    connections: ConnectionManager,
    batch_size: usize,
    log: Mutex<VecDeque<SyncLogEntry>>,
    running: tokio::sync::Mutex<()>,
}

impl Synchronizer {
    pub fn new(connections: ConnectionManager, batch_size: usize) -> Self {
        Self {
            connections,
            batch_size: batch_size.max(1),
            log: Mutex::new(VecDeque::with_capacity(MAX_SYNC_LOG)),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the secondary's copy of `table` with the primary's rows.
    ///
    /// Tables outside the allowlist are an error. A failed copy is reported
    /// in the returned result and leaves the secondary's rows untouched.
    pub async fn sync_table(&self, table: &str) -> Result<TableSyncResult> {
        if !is_syncable(table) {
            return Err(Error::TableNotAllowed {
                table: table.to_string(),
            });
        }
        let quoted = quote_ident(table)?;
        match self.replace_table(table, &quoted).await {
            Ok(rows) => Ok(TableSyncResult::ok(table, rows)),
            Err(e) => {
                error!(table, "table sync failed: {e}");
                Ok(TableSyncResult::failed(table, e))
            }
        }
    }

    async fn replace_table(&self, table: &str, quoted: &str) -> Result<u64> {
        let rows = self
            .connections
            .query_primary(&format!("SELECT row_to_json(t)::jsonb AS row FROM {quoted} t"), &[])
            .await?;
        let rows = unwrap_json_rows(rows);
        let total = rows.len();

        let insert_sql =
            format!("INSERT INTO {quoted} SELECT * FROM jsonb_populate_record(NULL::{quoted}, $1::jsonb)");
        let mut statements = Vec::with_capacity(total + 1);
        statements.push(Statement::new(format!("TRUNCATE TABLE {quoted} CASCADE"), vec![]));

        let batches = total.div_ceil(self.batch_size);
        let mut batch = 0;
        let mut in_batch = 0;
        for row in rows {
            statements.push(Statement::new(insert_sql.clone(), vec![Value::Object(row)]));
            in_batch += 1;
            if in_batch == self.batch_size {
                batch += 1;
                debug!(table, batch, batches, rows = in_batch, "batch queued");
                in_batch = 0;
            }
        }
        if in_batch > 0 {
            debug!(table, batch = batch + 1, batches, rows = in_batch, "batch queued");
        }

        self.connections.transaction_secondary(&statements).await?;
        info!(table, rows = total, "table synced");
        Ok(total as u64)
    }

    /// Sync every allowlisted table in order, continuing past failures.
    pub async fn sync_all_tables(&self) -> Result<SyncSummary> {
        let _guard = self.running.try_lock().map_err(|_| Error::SyncInProgress)?;
        let started_at = Utc::now();
        info!(tables = SYNC_TABLES.len(), "full sync started");

        let mut results = Vec::with_capacity(SYNC_TABLES.len());
        for table in SYNC_TABLES {
            let result = self
                .sync_table(table)
                .await
                .unwrap_or_else(|e| TableSyncResult::failed(table, e));
            results.push(result);
        }

        let entry = SyncLogEntry::from_results(started_at, Utc::now(), &results);
        info!(
            succeeded = entry.tables_succeeded,
            failed = entry.tables_failed,
            rows = entry.total_rows,
            "full sync finished"
        );
        self.push_log(entry.clone());
        Ok(SyncSummary {
            log: entry,
            results,
        })
    }

    /// Mirror one row-level change on the secondary.
    pub async fn sync_operation(
        &self,
        op: SyncOp,
        table: &str,
        data: &Value,
        primary_key: &str,
    ) -> SyncOperationResult {
        if !is_syncable(table) {
            return SyncOperationResult::failed(Error::TableNotAllowed {
                table: table.to_string(),
            });
        }
        let stmt = match operation_statement(op, table, data, primary_key) {
            Ok(s) => s,
            Err(e) => {
                warn!(table, ?op, "sync operation rejected: {e}");
                return SyncOperationResult::failed(e);
            }
        };
        match self.connections.execute_secondary(&stmt.sql, &stmt.params).await {
            Ok(n) => {
                debug!(table, ?op, rows = n, "operation mirrored");
                SyncOperationResult::ok()
            }
            Err(e) => SyncOperationResult::failed(e),
        }
    }

    /// Row counts on each side plus the most recent run summaries.
    pub async fn get_sync_status(&self) -> Result<SyncStatus> {
        let mut tables = Vec::with_capacity(SYNC_TABLES.len());
        for table in SYNC_TABLES {
            let sql = format!("SELECT COUNT(*)::bigint AS count FROM {}", quote_ident(table)?);
            let both = self.connections.query_both(&sql, &[]).await;
            let primary_count = both.primary.as_deref().and_then(count_of);
            let secondary_count = both.secondary.as_deref().and_then(count_of);
            tables.push(TableStatus {
                table: table.to_string(),
                primary_count,
                secondary_count,
                in_sync: primary_count.is_some() && primary_count == secondary_count,
            });
        }
        Ok(SyncStatus {
            tables,
            recent_syncs: self.recent_syncs(RECENT_SYNC_LOG),
        })
    }

    /// Diff column definitions of every allowlisted table.
    pub async fn compare_schemas(&self) -> Vec<TableSchemaComparison> {
        let mut out = Vec::with_capacity(SYNC_TABLES.len());
        for table in SYNC_TABLES {
            let both = self.connections.query_both(schema::COLUMNS_SQL, &[json!(table)]).await;
            let status = match (
                both.primary.map(decode_columns),
                both.secondary.map(decode_columns),
            ) {
                (Some(Ok(p)), Some(Ok(s))) => schema::classify(&p, &s),
                _ => SchemaStatus::Unavailable,
            };
            if !matches!(status, SchemaStatus::Matching) {
                warn!(table, ?status, "schema differs between databases");
            }
            out.push(TableSchemaComparison {
                table: table.to_string(),
                status,
            });
        }
        out
    }

    /// Newest first.
    pub fn recent_syncs(&self, n: usize) -> Vec<SyncLogEntry> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.iter().rev().take(n).cloned().collect()
    }

    fn push_log(&self, entry: SyncLogEntry) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        if log.len() == MAX_SYNC_LOG {
            log.pop_front();
        }
        log.push_back(entry);
    }
}

fn count_of(rows: &[Row]) -> Option<i64> {
    rows.first()?.get("count")?.as_i64()
}

fn decode_columns(rows: Vec<Row>) -> Result<Vec<ColumnInfo>> {
    rows.into_iter()
        .map(|r| serde_json::from_value(Value::Object(r)).map_err(Error::from))
        .collect()
}

/// Build the secondary-side statement mirroring one row change.
///
/// The row travels as a single `jsonb` parameter and is expanded with
/// `jsonb_populate_record`, so column types come from the table definition.
fn operation_statement(op: SyncOp, table: &str, data: &Value, primary_key: &str) -> Result<Statement> {
    let obj = data
        .as_object()
        .filter(|o| !o.is_empty())
        .ok_or_else(|| Error::InvalidRow("row data must be a non-empty object".into()))?;
    if !obj.contains_key(primary_key) {
        return Err(Error::InvalidRow(format!("row data has no '{primary_key}' key")));
    }

    let t = quote_ident(table)?;
    let pk = quote_ident(primary_key)?;
    let record = format!("jsonb_populate_record(NULL::{t}, $1::jsonb)");

    let mut columns = Vec::with_capacity(obj.len());
    let mut non_key = Vec::with_capacity(obj.len());
    for key in obj.keys() {
        let quoted = quote_ident(key)?;
        if key != primary_key {
            non_key.push(quoted.clone());
        }
        columns.push(quoted);
    }

    let sql = match op {
        SyncOp::Insert => {
            let cols = columns.join(", ");
            let on_conflict = if non_key.is_empty() {
                "DO NOTHING".to_string()
            } else {
                let sets: Vec<String> = non_key.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect();
                format!("DO UPDATE SET {}", sets.join(", "))
            };
            format!("INSERT INTO {t} ({cols}) SELECT {cols} FROM {record} ON CONFLICT ({pk}) {on_conflict}")
        }
        SyncOp::Update => {
            if non_key.is_empty() {
                return Err(Error::InvalidRow("no columns to update".into()));
            }
            let sets: Vec<String> = non_key.iter().map(|c| format!("{c} = r.{c}")).collect();
            format!(
                "UPDATE {t} AS t SET {} FROM {record} AS r WHERE t.{pk} = r.{pk}",
                sets.join(", ")
            )
        }
        SyncOp::Delete => format!("DELETE FROM {t} AS t USING {record} AS r WHERE t.{pk} = r.{pk}"),
    };
    Ok(Statement::new(sql, vec![data.clone()]))
}
