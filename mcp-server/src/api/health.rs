//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use countries_mcp_types::HealthResponse;

use crate::state::AppState;

/// GET /health - liveness with uptime and live session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_secs(),
        sessions: state.sessions().session_count().await,
    })
}
