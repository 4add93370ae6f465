//! tarl-sync library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration wiring, shared state
//! - `config`: environment-driven settings
//! - `db`: backend seam, PostgreSQL pools, connection manager, migrations
//! - `audit`: activity trail and soft delete / restore
//! - `sync`: primary → secondary replication, status, schema diff, scheduler
//! - `http`: Axum control-plane router and handlers
//! - `models`: typed records used across layers
//! - `util`: tracing setup

pub mod app;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod sync;
pub mod util;
