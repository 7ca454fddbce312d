//! MCP (Model Context Protocol) server over SSE and stdio.
//!
//! A protocol server ([`McpServer`]) is bound to exactly one [`Transport`].
//! Over HTTP every SSE connection gets its own server/transport pair, kept in
//! the [`SessionManager`] table until the stream closes:
//!
//! - `GET /mcp` - open an SSE stream; the first `endpoint` event names the
//!   URL to post messages to
//! - `POST /mcp/messages?sessionId=<id>` - deliver a JSON-RPC message to the
//!   session; the response arrives on the stream as a `message` event
//!
//! The stdio binary binds a single server to stdin/stdout instead.

pub mod handler;
pub mod server;
pub mod session;
pub mod sse;
pub mod stdio;
pub mod transport;

pub use handler::McpHandler;
pub use server::{McpServer, ServerError, ServerFactory, ServerIdentity};
pub use session::{SessionError, SessionManager, TransportBuilder};
pub use sse::{SseMessage, SseStream, SseTransport};
pub use stdio::StdioTransport;
pub use transport::{Transport, TransportError};
