//! Database helpers: backend seam, identifier quoting and migrations.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod connections;
pub mod memory;
pub mod postgres;

/// One result row as `column -> value`.
pub type Row = Map<String, Value>;

/// A statement with positional (`$1..$n`) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A SQL backend the replication and audit layers run against.
///
/// Parameters are JSON values: null, bool, integer, float and string bind as
/// their scalar SQL types, arrays and objects bind as `jsonb`. Statements that
/// pass a nullable parameter should cast it explicitly (`$3::bigint`).
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a row-returning statement.
    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement and return the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run every statement in one transaction; nothing is applied if any fails.
    async fn execute_in_transaction(&self, statements: &[Statement]) -> Result<u64>;

    async fn close(&self);
}

/// Quote a table or column name for interpolation into SQL.
///
/// Only plain identifiers are accepted; anything else is rejected instead of
/// escaped.
pub fn quote_ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start || !valid_rest || name.len() > 63 {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Unpack `row_to_json(t) AS row` results into plain rows.
pub fn unwrap_json_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .filter_map(|mut r| match r.remove("row") {
            Some(Value::Object(inner)) => Some(inner),
            _ => None,
        })
        .collect()
}

/// Create the activity table and the soft-delete functions if absent.
pub async fn run_migrations(db: &dyn Database) -> Result<()> {
    db.execute(
        r#"CREATE TABLE IF NOT EXISTS tbl_tarl_user_activities (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NULL,
            username TEXT NULL,
            user_role TEXT NULL,
            action_type TEXT NOT NULL CHECK (action_type IN ('CREATE','READ','UPDATE','DELETE','LOGIN','LOGOUT','RESTORE')),
            table_name TEXT NOT NULL,
            record_id BIGINT NULL,
            old_data JSONB NULL,
            new_data JSONB NULL,
            changes_summary TEXT NULL,
            ip_address TEXT NULL,
            user_agent TEXT NULL,
            session_id TEXT NULL,
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
        &[],
    )
    .await?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_tarl_user_activities_user ON tbl_tarl_user_activities (user_id, created_at DESC)",
        &[],
    )
    .await?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_tarl_user_activities_record ON tbl_tarl_user_activities (table_name, record_id)",
        &[],
    )
    .await?;

    db.execute(
        r#"CREATE OR REPLACE FUNCTION soft_delete_record(
            p_table_name TEXT,
            p_record_id BIGINT,
            p_user_id BIGINT,
            p_reason TEXT DEFAULT NULL
        ) RETURNS BOOLEAN AS $$
        DECLARE
            v_old JSONB;
        BEGIN
            EXECUTE format('SELECT to_jsonb(t) FROM %I t WHERE id = $1 AND NOT is_deleted', p_table_name)
                INTO v_old USING p_record_id;
            IF v_old IS NULL THEN
                RETURN FALSE;
            END IF;
            EXECUTE format('UPDATE %I SET is_deleted = TRUE, deleted_at = NOW(), deleted_by = $1 WHERE id = $2', p_table_name)
                USING p_user_id, p_record_id;
            INSERT INTO tbl_tarl_user_activities (user_id, action_type, table_name, record_id, old_data, changes_summary)
                VALUES (p_user_id, 'DELETE', p_table_name, p_record_id, v_old, COALESCE(p_reason, 'soft delete'));
            RETURN TRUE;
        END;
        $$ LANGUAGE plpgsql"#,
        &[],
    )
    .await?;

    db.execute(
        r#"CREATE OR REPLACE FUNCTION restore_deleted_record(
            p_table_name TEXT,
            p_record_id BIGINT,
            p_user_id BIGINT
        ) RETURNS BOOLEAN AS $$
        DECLARE
            v_rows INTEGER;
        BEGIN
            EXECUTE format('UPDATE %I SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL WHERE id = $1 AND is_deleted', p_table_name)
                USING p_record_id;
            GET DIAGNOSTICS v_rows = ROW_COUNT;
            IF v_rows = 0 THEN
                RETURN FALSE;
            END IF;
            INSERT INTO tbl_tarl_user_activities (user_id, action_type, table_name, record_id, changes_summary)
                VALUES (p_user_id, 'RESTORE', p_table_name, p_record_id, 'restored');
            RETURN TRUE;
        END;
        $$ LANGUAGE plpgsql"#,
        &[],
    )
    .await?;
    Ok(())
}
