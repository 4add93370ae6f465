//! Primary/secondary connection manager.

use super::{Database, Row, Statement, postgres::PgDatabase};
use crate::config::Config;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-side outcome of [`ConnectionManager::query_both`]. A side that failed
/// is `None`.
#[derive(Debug, Default, Serialize)]
pub struct DualResult {
    pub primary: Option<Vec<Row>>,
    pub secondary: Option<Vec<Row>>,
}

/// Reachability of each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub local: bool,
    pub remote: bool,
}

/// Owns the local primary and remote secondary databases.
#[derive(Clone)]
pub struct ConnectionManager {
    primary: Arc<dyn Database>,
    secondary: Arc<dyn Database>,
}

impl ConnectionManager {
    pub fn new(primary: Arc<dyn Database>, secondary: Arc<dyn Database>) -> Self {
        Self { primary, secondary }
    }

    /// Build both PostgreSQL pools. No connection is opened until first use.
    pub fn connect(cfg: &Config) -> Result<Self> {
        let primary = PgDatabase::connect_lazy(&cfg.primary)?;
        let secondary = PgDatabase::connect_lazy(&cfg.secondary)?;
        Ok(Self::new(Arc::new(primary), Arc::new(secondary)))
    }

    pub fn primary(&self) -> &dyn Database {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> &dyn Database {
        self.secondary.as_ref()
    }

    pub async fn query_primary(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.primary.fetch(sql, params).await.inspect_err(|e| {
            error!("primary query failed: {e}");
        })
    }

    pub async fn query_secondary(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.secondary.fetch(sql, params).await.inspect_err(|e| {
            error!("secondary query failed: {e}");
        })
    }

    pub async fn execute_primary(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.primary.execute(sql, params).await.inspect_err(|e| {
            error!("primary statement failed: {e}");
        })
    }

    pub async fn execute_secondary(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.secondary.execute(sql, params).await.inspect_err(|e| {
            error!("secondary statement failed: {e}");
        })
    }

    pub async fn transaction_secondary(&self, statements: &[Statement]) -> Result<u64> {
        self.secondary
            .execute_in_transaction(statements)
            .await
            .inspect_err(|e| {
                error!("secondary transaction failed: {e}");
            })
    }

    /// Run the same query on both sides concurrently.
    ///
    /// Never fails: each side's error is logged and its slot left empty.
    pub async fn query_both(&self, sql: &str, params: &[Value]) -> DualResult {
        let (primary, secondary) = tokio::join!(
            self.primary.fetch(sql, params),
            self.secondary.fetch(sql, params)
        );
        DualResult {
            primary: primary
                .inspect_err(|e| warn!("query_both: primary side failed: {e}"))
                .ok(),
            secondary: secondary
                .inspect_err(|e| warn!("query_both: secondary side failed: {e}"))
                .ok(),
        }
    }

    /// Probe both sides with a trivial query.
    pub async fn test_connections(&self) -> ConnectionStatus {
        let probe = "SELECT 1 AS ok";
        let (local, remote) = tokio::join!(
            self.primary.fetch(probe, &[]),
            self.secondary.fetch(probe, &[])
        );
        let status = ConnectionStatus {
            local: local
                .inspect_err(|e| warn!("local database unreachable: {e}"))
                .is_ok(),
            remote: remote
                .inspect_err(|e| warn!("remote database unreachable: {e}"))
                .is_ok(),
        };
        info!(local = status.local, remote = status.remote, "connection probe");
        status
    }

    pub async fn close(&self) {
        tokio::join!(self.primary.close(), self.secondary.close());
        info!("database connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDatabase;
    use serde_json::json;

    fn manager(primary: MemoryDatabase, secondary: MemoryDatabase) -> ConnectionManager {
        ConnectionManager::new(Arc::new(primary), Arc::new(secondary))
    }

    #[tokio::test]
    async fn single_sided_failures_are_returned() {
        let mgr = manager(MemoryDatabase::unavailable(), MemoryDatabase::new());
        assert!(mgr.query_primary("SELECT 1", &[]).await.is_err());
        assert!(mgr.execute_primary("DELETE FROM t", &[]).await.is_err());
        assert!(mgr.query_secondary("SELECT 1", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn query_both_keeps_the_surviving_side() {
        let secondary = MemoryDatabase::new();
        secondary.respond("SELECT", vec![json!({"n": 7}).as_object().cloned().unwrap()]);
        let mgr = manager(MemoryDatabase::unavailable(), secondary);

        let out = mgr.query_both("SELECT n FROM t", &[]).await;
        assert!(out.primary.is_none());
        let rows = out.secondary.expect("secondary result");
        assert_eq!(rows[0]["n"], 7);
    }

    #[tokio::test]
    async fn query_both_keeps_the_primary_when_the_secondary_is_down() {
        let primary = MemoryDatabase::new();
        primary.respond("SELECT", vec![json!({"n": 3}).as_object().cloned().unwrap()]);
        let mgr = manager(primary, MemoryDatabase::unavailable());

        let out = mgr.query_both("SELECT n FROM t", &[]).await;
        assert!(out.secondary.is_none());
        let rows = out.primary.expect("primary result");
        assert_eq!(rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn test_connections_reports_each_side() {
        let mgr = manager(MemoryDatabase::new(), MemoryDatabase::unavailable());
        assert_eq!(
            mgr.test_connections().await,
            ConnectionStatus { local: true, remote: false }
        );

        let mgr = manager(MemoryDatabase::unavailable(), MemoryDatabase::new());
        assert_eq!(
            mgr.test_connections().await,
            ConnectionStatus { local: false, remote: true }
        );
    }
}
