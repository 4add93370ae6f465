//! Application setup and runtime.

use crate::{
  audit::AuditLogger,
  config::Config,
  db::{self, connections::ConnectionManager},
  http,
  sync::{Synchronizer, scheduler::start_batch_sync},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub connections: ConnectionManager,
  pub audit: AuditLogger,
  pub sync: Arc<Synchronizer>,
}

impl AppState {
  pub fn new(connections: ConnectionManager, batch_size: usize) -> Self {
    Self {
      audit: AuditLogger::new(connections.clone()),
      sync: Arc::new(Synchronizer::new(connections.clone(), batch_size)),
      connections,
    }
  }
}

/// Connect both databases, start the scheduler and serve the control plane.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let cfg = Config::from_env()?;
  let connections = ConnectionManager::connect(&cfg)?;

  let status = connections.test_connections().await;
  if !status.local {
    warn!("local database not reachable at startup");
  }
  if !status.remote {
    warn!("remote database not reachable at startup; replication will fail until it is");
  }

  if cfg.run_migrations {
    if let Err(e) = db::run_migrations(connections.primary()).await {
      error!("migrations failed: {e}");
      return Err(e.into());
    }
    info!("audit schema ready");
  }

  let state = AppState::new(connections.clone(), cfg.sync.batch_size);
  let scheduler = cfg
    .sync
    .interval
    .map(|period| start_batch_sync(state.sync.clone(), period));

  let app = http::build_router(state);

  info!("control plane:   http://{}/health", cfg.addr);
  info!("sync status:     GET  http://{}/sync/status", cfg.addr);
  info!("full sync:       POST http://{}/sync/all", cfg.addr);

  let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  if let Some(handle) = scheduler {
    handle.stop().await;
  }
  connections.close().await;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}
