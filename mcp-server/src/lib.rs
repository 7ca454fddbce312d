//! Countries MCP server library.
//!
//! Serves the `get_country_data` tool over the MCP SSE transport, one protocol
//! server per connection.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use std::convert::Infallible;
use countries_mcp_types::{MCP_MESSAGE_PATH, MCP_STREAM_PATH};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod config;
pub mod mcp;
pub mod state;
pub mod tools;

use state::AppState;

/// Sets `name` on every response of a route unless the handler already did.
fn cors_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

/// Create the Axum application router with a given state.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health).fallback(api::not_found))
        // CORS headers are layered so extractor rejections carry them too
        .route(
            MCP_STREAM_PATH,
            get(api::mcp::mcp_stream)
                .options(api::mcp::mcp_options)
                .fallback(api::not_found)
                .layer::<_, Infallible>(cors_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")),
        )
        .route(
            MCP_MESSAGE_PATH,
            post(api::mcp::mcp_message)
                .options(api::mcp::mcp_options)
                .fallback(api::not_found)
                .layer::<_, Infallible>(DefaultBodyLimit::max(api::mcp::MAX_MESSAGE_BYTES))
                .layer::<_, Infallible>(cors_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
                .layer(cors_header(header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type")),
        )
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
