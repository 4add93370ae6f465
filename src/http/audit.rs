//! Audit trail APIs.

use crate::{app::AppState, error::Error, models::audit::activity_entry::ActivityEntry};
use axum::{
  Json,
  extract::{Path as AxumPath, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
  pub limit: Option<u32>,
  pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SoftDeleteRequest {
  pub table: String,
  pub record_id: i64,
  pub user_id: Option<i64>,
  pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
  pub table: String,
  pub record_id: i64,
  pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
  pub success: bool,
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
  limit.unwrap_or(50).clamp(1, 500)
}

pub async fn list_activities(
  State(state): State<AppState>,
  Query(params): Query<ActivityParams>,
) -> impl IntoResponse {
  let limit = clamp_limit(params.limit);
  match state.audit.get_recent_activities(limit, params.user_id).await {
    Ok(rows) => Json(rows).into_response(),
    Err(e) => {
      error!("list_activities error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

/// Accepted even when the insert fails; logging never blocks the caller.
pub async fn log_activity(
  State(state): State<AppState>,
  Json(entry): Json<ActivityEntry>,
) -> impl IntoResponse {
  state.audit.log_activity(&entry).await;
  StatusCode::ACCEPTED
}

pub async fn soft_delete(
  State(state): State<AppState>,
  Json(req): Json<SoftDeleteRequest>,
) -> impl IntoResponse {
  let success = state
    .audit
    .soft_delete(&req.table, req.record_id, req.user_id, req.reason.as_deref())
    .await;
  Json(SuccessResponse { success })
}

pub async fn restore(
  State(state): State<AppState>,
  Json(req): Json<RestoreRequest>,
) -> impl IntoResponse {
  let success = state
    .audit
    .restore_record(&req.table, req.record_id, req.user_id)
    .await;
  Json(SuccessResponse { success })
}

pub async fn record_history(
  State(state): State<AppState>,
  AxumPath((table, record_id)): AxumPath<(String, i64)>,
) -> impl IntoResponse {
  match state.audit.get_record_history(&table, record_id).await {
    Ok(rows) => Json(rows).into_response(),
    Err(e) => {
      error!("record_history error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn deleted_records(
  State(state): State<AppState>,
  AxumPath(table): AxumPath<String>,
) -> impl IntoResponse {
  match state.audit.get_deleted_records(&table).await {
    Ok(rows) => Json(rows).into_response(),
    Err(e @ Error::TableNotAllowed { .. }) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    Err(e) => {
      error!("deleted_records error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
