//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub mod audit;
pub mod health;
pub mod sync;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/sync/status", get(sync::sync_status))
        .route("/sync/all", post(sync::sync_all))
        .route("/sync/tables/:table", post(sync::sync_one_table))
        .route("/sync/operation", post(sync::sync_operation))
        .route("/sync/schemas", get(sync::compare_schemas))
        .route(
            "/audit/activities",
            get(audit::list_activities).post(audit::log_activity),
        )
        .route("/audit/soft-delete", post(audit::soft_delete))
        .route("/audit/restore", post(audit::restore))
        .route("/audit/history/:table/:record_id", get(audit::record_history))
        .route("/audit/deleted/:table", get(audit::deleted_records))
        .with_state(state)
}
