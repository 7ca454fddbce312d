//! MCP SSE endpoint handlers.
//!
//! ## Endpoints
//!
//! - `GET /mcp` - Open an SSE stream; creates a session
//! - `POST /mcp/messages?sessionId=<id>` - Send a JSON-RPC message to a session
//! - `OPTIONS` on both paths - CORS preflight
//!
//! `Access-Control-Allow-Origin` is set by a layer on both routes in
//! [`create_app`](crate::create_app).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::mcp::{SessionError, TransportError};
use crate::state::AppState;

/// Largest message body accepted on the message endpoint.
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// OPTIONS /mcp, /mcp/messages - CORS preflight.
pub async fn mcp_options() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
        ],
    )
        .into_response()
}

/// GET /mcp - Open an SSE stream bound to a new session.
///
/// The first event is `endpoint`, naming the URL (with `sessionId`) to post
/// messages to. Responses arrive as `message` events.
pub async fn mcp_stream(State(state): State<AppState>) -> Response {
    match state.sessions().open_session().await {
        Ok((session_id, stream)) => {
            info!("MCP: SSE stream opened for session {}", session_id);
            let events = stream.map(|message| Ok::<_, Infallible>(message.into_event()));
            Sse::new(events)
                .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
                .into_response()
        }
        Err(SessionError::ShuttingDown) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to establish SSE connection: {}", e),
        )
            .into_response(),
    }
}

/// POST /mcp/messages - Deliver a JSON-RPC message to a session.
///
/// Answers `202 Accepted` once the message is queued; the JSON-RPC response
/// itself goes out on the session's SSE stream.
pub async fn mcp_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match query.session_id.filter(|id| !id.is_empty()) {
        None => {
            debug!("MCP: message posted without sessionId");
            (StatusCode::BAD_REQUEST, "Missing sessionId query params").into_response()
        }
        Some(_) if !is_json(&headers) => {
            (StatusCode::BAD_REQUEST, "Unsupported content-type").into_response()
        }
        Some(session_id) => match state.sessions().route_message(&session_id, &body).await {
            Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
            Err(e) => session_error_response(e),
        },
    }
}

fn session_error_response(error: SessionError) -> Response {
    match error {
        SessionError::NotFound(id) => {
            debug!("MCP: message for unknown session {}", id);
            (StatusCode::NOT_FOUND, "Session not found").into_response()
        }
        SessionError::Message(TransportError::InvalidMessage(e)) => {
            (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e)).into_response()
        }
        e => {
            error!("MCP: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
