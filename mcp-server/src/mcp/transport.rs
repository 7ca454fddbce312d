//! Transport abstraction shared by the SSE and stdio bindings.

use async_trait::async_trait;
use countries_mcp_types::{JsonRpcRequest, JsonRpcResponse};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,

    #[error("Transport already started")]
    AlreadyStarted,

    #[error("SSE connection not established")]
    NotStarted,

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bidirectional JSON-RPC channel a protocol server is bound to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin the connection. Called once by [`McpServer::connect`](super::McpServer::connect).
    async fn start(&self) -> Result<(), TransportError>;

    /// Next inbound message, or `None` once the transport is closed.
    async fn receive(&self) -> Option<JsonRpcRequest>;

    /// Deliver a response to the peer.
    async fn send(&self, response: &JsonRpcResponse) -> Result<(), TransportError>;

    /// Close the transport. Closing twice is a no-op.
    async fn close(&self);
}

/// Decode a single JSON-RPC message.
pub fn decode_request(raw: &[u8]) -> Result<JsonRpcRequest, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Error response for a message that failed [`decode_request`].
pub fn decode_error_response(error: &serde_json::Error) -> JsonRpcResponse {
    use countries_mcp_types::jsonrpc::INVALID_REQUEST;
    use serde_json::error::Category;

    match error.classify() {
        // Well-formed JSON that is not a request object
        Category::Data => JsonRpcResponse::error(
            serde_json::Value::Null,
            INVALID_REQUEST,
            format!("Invalid request: {}", error),
        ),
        _ => JsonRpcResponse::parse_error(format!("Parse error: {}", error)),
    }
}
