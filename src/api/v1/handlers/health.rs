/*
 * Responsibility
 * - GET /health (疎通用)
 * - Mounted outside the security context: no credential is looked at
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
