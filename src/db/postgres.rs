//! PostgreSQL backend over a lazily connected `sqlx` pool.

use super::{Database, Row, Statement};
use crate::config::DatabaseCfg;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{
    Column, PgPool, Postgres, Row as _, TypeInfo,
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
};
use tracing::trace;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Build a pool that opens connections on first use.
    pub fn connect_lazy(cfg: &DatabaseCfg) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect_lazy(&cfg.url)?;
        Ok(Self { pool })
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.as_str()),
            other => query.bind(sqlx::types::Json(other)),
        };
    }
    query
}

/// Decode a row into JSON by column type.
fn row_to_json(row: &PgRow) -> Row {
    let mut out = Map::with_capacity(row.columns().len());
    for col in row.columns() {
        let idx = col.ordinal();
        let value = match col.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(idx).ok().flatten().map(Value::from),
            "INT2" => row.try_get::<Option<i16>, _>(idx).ok().flatten().map(Value::from),
            "INT4" => row.try_get::<Option<i32>, _>(idx).ok().flatten().map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(idx).ok().flatten().map(Value::from),
            "FLOAT4" => row.try_get::<Option<f32>, _>(idx).ok().flatten().map(Value::from),
            "FLOAT8" => row.try_get::<Option<f64>, _>(idx).ok().flatten().map(Value::from),
            "JSON" | "JSONB" => row
                .try_get::<Option<sqlx::types::Json<Value>>, _>(idx)
                .ok()
                .flatten()
                .map(|j| j.0),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .ok()
                .flatten()
                .map(|t| Value::from(t.to_rfc3339())),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .ok()
                .flatten()
                .map(|t| Value::from(t.to_string())),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|d| Value::from(d.to_string())),
            "UUID" => row
                .try_get::<Option<Uuid>, _>(idx)
                .ok()
                .flatten()
                .map(|u| Value::from(u.to_string())),
            other => match row.try_get::<Option<String>, _>(idx) {
                Ok(v) => v.map(Value::from),
                Err(e) => {
                    trace!("column {} of type {other} not decoded: {e}", col.name());
                    None
                }
            },
        };
        out.insert(col.name().to_string(), value.unwrap_or(Value::Null));
    }
    out
}

#[async_trait]
impl Database for PgDatabase {
    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let done = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn execute_in_transaction(&self, statements: &[Statement]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for stmt in statements {
            let done = bind_params(sqlx::query(&stmt.sql), &stmt.params)
                .execute(&mut *tx)
                .await?;
            affected += done.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
