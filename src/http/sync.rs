//! Replication control: status, triggers, row mirroring and schema diff.

use crate::{
  app::AppState,
  error::Error,
  models::sync::sync_operation::SyncOperationRequest,
};
use axum::{
  Json,
  extract::{Path as AxumPath, State},
  http::StatusCode,
  response::IntoResponse,
};
use tracing::error;

pub async fn sync_status(State(state): State<AppState>) -> impl IntoResponse {
  match state.sync.get_sync_status().await {
    Ok(status) => Json(status).into_response(),
    Err(e) => {
      error!("sync_status error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "status unavailable").into_response()
    }
  }
}

pub async fn sync_all(State(state): State<AppState>) -> impl IntoResponse {
  match state.sync.sync_all_tables().await {
    Ok(summary) => Json(summary).into_response(),
    Err(Error::SyncInProgress) => {
      (StatusCode::CONFLICT, "a full sync is already running").into_response()
    }
    Err(e) => {
      error!("sync_all error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "sync failed").into_response()
    }
  }
}

pub async fn sync_one_table(
  State(state): State<AppState>,
  AxumPath(table): AxumPath<String>,
) -> impl IntoResponse {
  match state.sync.sync_table(&table).await {
    Ok(result) if result.success => Json(result).into_response(),
    Ok(result) => (StatusCode::BAD_GATEWAY, Json(result)).into_response(),
    // Only name checks fail before the copy starts.
    Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
  }
}

/// Always 200: the body's `success` flag carries the outcome.
pub async fn sync_operation(
  State(state): State<AppState>,
  Json(req): Json<SyncOperationRequest>,
) -> impl IntoResponse {
  let result = state
    .sync
    .sync_operation(req.operation, &req.table, &req.data, &req.primary_key)
    .await;
  Json(result)
}

pub async fn compare_schemas(State(state): State<AppState>) -> impl IntoResponse {
  Json(state.sync.compare_schemas().await)
}
