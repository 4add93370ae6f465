//! Connectivity probe.

use crate::app::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// 200 when both databases answer, 503 otherwise; the body always carries
/// the per-side status.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
  let status = state.connections.test_connections().await;
  let code = if status.local && status.remote {
    StatusCode::OK
  } else {
    StatusCode::SERVICE_UNAVAILABLE
  };
  (code, Json(status))
}
