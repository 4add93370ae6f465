//! Audit trail: activity logging and soft delete / restore.
//!
//! Writes go to `tbl_tarl_user_activities` on the primary database. Logging
//! never propagates a failure: auditing must not break the operation that
//! triggered it.

use crate::{
    db::{Row, connections::ConnectionManager, quote_ident, unwrap_json_rows},
    error::{Error, Result},
    models::audit::{activity_entry::ActivityEntry, activity_record::ActivityRecord},
    sync::tables::is_syncable,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const ACTIVITY_TABLE: &str = "tbl_tarl_user_activities";

const ACTIVITY_COLUMNS: &str = "id, user_id, username, user_role, action_type, table_name, record_id, old_data, new_data, changes_summary, ip_address, user_agent, session_id, is_deleted, created_at";

#[derive(Clone)]
pub struct AuditLogger {
    connections: ConnectionManager,
}

impl AuditLogger {
    pub fn new(connections: ConnectionManager) -> Self {
        Self { connections }
    }

    /// Append one activity. Failures are logged and dropped.
    pub async fn log_activity(&self, entry: &ActivityEntry) {
        let sql = format!(
            "INSERT INTO {ACTIVITY_TABLE} (user_id, username, user_role, action_type, table_name, record_id, old_data, new_data, changes_summary, ip_address, user_agent, session_id) \
             VALUES ($1::bigint, $2::text, $3::text, $4::text, $5::text, $6::bigint, $7::jsonb, $8::jsonb, $9::text, $10::text, $11::text, $12::text)"
        );
        let params = [
            json!(entry.user_id),
            json!(entry.username),
            json!(entry.user_role),
            json!(entry.action.as_str()),
            json!(entry.table_name),
            json!(entry.record_id),
            snapshot_param(entry.old_data.as_ref()),
            snapshot_param(entry.new_data.as_ref()),
            json!(entry.changes_summary),
            json!(entry.ip_address),
            json!(entry.user_agent),
            json!(entry.session_id),
        ];
        match self.connections.primary().execute(&sql, &params).await {
            Ok(_) => debug!(
                action = %entry.action,
                table = %entry.table_name,
                "activity logged"
            ),
            Err(e) => warn!(
                action = %entry.action,
                table = %entry.table_name,
                "audit log insert failed: {e}"
            ),
        }
    }

    /// Mark a record deleted through `soft_delete_record`.
    ///
    /// Returns `false` when the record was not live or the call failed.
    pub async fn soft_delete(
        &self,
        table: &str,
        record_id: i64,
        user_id: Option<i64>,
        reason: Option<&str>,
    ) -> bool {
        let params = [json!(table), json!(record_id), json!(user_id), json!(reason)];
        self.call_bool(
            "SELECT soft_delete_record($1::text, $2::bigint, $3::bigint, $4::text) AS success",
            &params,
            "soft_delete_record",
        )
        .await
    }

    /// Undo a soft delete through `restore_deleted_record`.
    pub async fn restore_record(&self, table: &str, record_id: i64, user_id: Option<i64>) -> bool {
        let params = [json!(table), json!(record_id), json!(user_id)];
        self.call_bool(
            "SELECT restore_deleted_record($1::text, $2::bigint, $3::bigint) AS success",
            &params,
            "restore_deleted_record",
        )
        .await
    }

    async fn call_bool(&self, sql: &str, params: &[Value], function: &str) -> bool {
        match self.connections.query_primary(sql, params).await {
            Ok(rows) => rows
                .first()
                .and_then(|r| r.get("success"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Err(e) => {
                warn!("{function} failed: {e}");
                false
            }
        }
    }

    /// Most recent activities first, optionally for one user.
    pub async fn get_recent_activities(
        &self,
        limit: u32,
        user_id: Option<i64>,
    ) -> Result<Vec<ActivityRecord>> {
        let (sql, params) = match user_id {
            Some(uid) => (
                format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM {ACTIVITY_TABLE} WHERE user_id = $1::bigint ORDER BY created_at DESC, id DESC LIMIT $2::bigint"
                ),
                vec![json!(uid), json!(limit)],
            ),
            None => (
                format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM {ACTIVITY_TABLE} ORDER BY created_at DESC, id DESC LIMIT $1::bigint"
                ),
                vec![json!(limit)],
            ),
        };
        let rows = self.connections.query_primary(&sql, &params).await?;
        let mut records = decode_records(rows)?;
        if let Some(uid) = user_id {
            records.retain(|r| r.entry.user_id == Some(uid));
        }
        records.truncate(limit as usize);
        Ok(records)
    }

    /// Every activity recorded against one record, oldest first.
    pub async fn get_record_history(&self, table: &str, record_id: i64) -> Result<Vec<ActivityRecord>> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM {ACTIVITY_TABLE} WHERE table_name = $1::text AND record_id = $2::bigint ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .connections
            .query_primary(&sql, &[json!(table), json!(record_id)])
            .await?;
        decode_records(rows)
    }

    /// Soft-deleted rows of a replicated table, newest deletion first.
    pub async fn get_deleted_records(&self, table: &str) -> Result<Vec<Row>> {
        if !is_syncable(table) {
            return Err(Error::TableNotAllowed {
                table: table.to_string(),
            });
        }
        let sql = format!(
            "SELECT row_to_json(t)::jsonb AS row FROM {} t WHERE t.is_deleted ORDER BY t.deleted_at DESC NULLS LAST",
            quote_ident(table)?
        );
        let rows = self.connections.query_primary(&sql, &[]).await?;
        Ok(unwrap_json_rows(rows))
    }
}

/// Snapshots bind as `jsonb`; scalars are wrapped so they are not bound as text.
fn snapshot_param(v: Option<&Value>) -> Value {
    match v {
        None | Some(Value::Null) => Value::Null,
        Some(v @ (Value::Object(_) | Value::Array(_))) => v.clone(),
        Some(other) => json!({ "value": other }),
    }
}

fn decode_records(rows: Vec<Row>) -> Result<Vec<ActivityRecord>> {
    rows.into_iter()
        .map(|r| serde_json::from_value(Value::Object(r)).map_err(Error::from))
        .collect()
}
