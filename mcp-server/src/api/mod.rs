//! HTTP API handlers.

pub mod health;
pub mod mcp;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Fallback for every unmatched path or method.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
