//! Shared types for the countries MCP server.
//!
//! This crate contains the JSON-RPC wire types, the tool contract and the
//! HTTP payloads used by both transports of the server.

/// Default port for the HTTP/SSE server.
pub const DEFAULT_PORT: u16 = 8000;

/// Path that opens a new SSE session.
pub const MCP_STREAM_PATH: &str = "/mcp";

/// Path that accepts JSON-RPC messages for an existing session.
pub const MCP_MESSAGE_PATH: &str = "/mcp/messages";

/// Query parameter carrying the session identifier on message posts.
pub const SESSION_ID_PARAM: &str = "sessionId";

pub mod health;
pub mod jsonrpc;
pub mod tool;

// Re-export commonly used types
pub use health::HealthResponse;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use tool::{
    CallToolResult, CountryDataOutput, GetCountryDataParams, TextContent, ToolDefinition,
};
