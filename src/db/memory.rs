//! Scripted in-memory backend.
//!
//! Records every statement it receives and answers `fetch` calls from
//! responses registered against SQL fragments. It has no SQL engine; callers
//! script exactly what each query returns. Used by the test suites to drive
//! the connection manager, synchronizer and audit logger without a server.

use super::{Database, Row, Statement};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryDatabase {
    responses: Mutex<Vec<(String, Vec<Row>)>>,
    failing_fragments: Mutex<Vec<String>>,
    log: Mutex<Vec<Statement>>,
    unavailable: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that refuses every call, as an unreachable host would.
    pub fn unavailable() -> Self {
        let db = Self::default();
        db.set_unavailable(true);
        db
    }

    /// Answer `fetch` calls whose SQL contains `fragment` with `rows`.
    ///
    /// Later registrations win over earlier ones.
    pub fn respond(&self, fragment: impl Into<String>, rows: Vec<Row>) {
        lock(&self.responses).push((fragment.into(), rows));
    }

    /// Fail any statement whose SQL contains `fragment`.
    pub fn fail_on(&self, fragment: impl Into<String>) {
        lock(&self.failing_fragments).push(fragment.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        lock(&self.log).clone()
    }

    /// Number of received statements whose SQL starts with `prefix`.
    pub fn count_starting_with(&self, prefix: &str) -> usize {
        lock(&self.log)
            .iter()
            .filter(|s| s.sql.trim_start().starts_with(prefix))
            .count()
    }

    fn check(&self, sql: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        if lock(&self.failing_fragments).iter().any(|f| sql.contains(f.as_str())) {
            return Err(Error::Database(sqlx::Error::Protocol(format!(
                "scripted failure for: {sql}"
            ))));
        }
        Ok(())
    }

    fn record(&self, sql: &str, params: &[Value]) {
        lock(&self.log).push(Statement::new(sql, params.to_vec()));
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.check(sql)?;
        self.record(sql, params);
        let responses = lock(&self.responses);
        Ok(responses
            .iter()
            .rev()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.check(sql)?;
        self.record(sql, params);
        Ok(1)
    }

    async fn execute_in_transaction(&self, statements: &[Statement]) -> Result<u64> {
        // Validate the whole batch first so a failure records nothing.
        for stmt in statements {
            self.check(&stmt.sql)?;
        }
        let mut log = lock(&self.log);
        log.extend(statements.iter().cloned());
        Ok(statements.len() as u64)
    }

    async fn close(&self) {}
}
