//! Protocol server instances and the factory that builds one per connection.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::handler::McpHandler;
use super::transport::{Transport, TransportError};
use crate::tools::ToolRegistry;

/// Name and version reported in `initialize`.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "countries-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server is not connected")]
    NotConnected,

    #[error("Server is already connected")]
    AlreadyConnected,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

struct Connection {
    transport: Arc<dyn Transport>,
    task: JoinHandle<()>,
    finished: CancellationToken,
}

/// A protocol server bound to at most one transport.
pub struct McpServer {
    handler: Arc<McpHandler>,
    connection: Mutex<Option<Connection>>,
}

impl McpServer {
    pub fn new(handler: McpHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            connection: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Start the transport and serve its messages in a background task.
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<(), ServerError> {
        if self.is_connected() {
            return Err(ServerError::AlreadyConnected);
        }

        transport.start().await?;

        let finished = CancellationToken::new();
        let task = tokio::spawn(serve(
            self.handler.clone(),
            transport.clone(),
            finished.clone(),
        ));

        *self.connection.lock() = Some(Connection {
            transport,
            task,
            finished,
        });
        Ok(())
    }

    /// Stop serving and close the bound transport.
    pub async fn close(&self) -> Result<(), ServerError> {
        let connection = self
            .connection
            .lock()
            .take()
            .ok_or(ServerError::NotConnected)?;

        connection.transport.close().await;
        connection.task.abort();
        Ok(())
    }

    /// Resolves when the serve loop has ended (transport closed or server closed).
    pub async fn wait(&self) -> Result<(), ServerError> {
        let finished = self
            .connection
            .lock()
            .as_ref()
            .map(|c| c.finished.clone())
            .ok_or(ServerError::NotConnected)?;
        finished.cancelled().await;
        Ok(())
    }
}

/// Messages of one connection are handled in arrival order.
async fn serve(
    handler: Arc<McpHandler>,
    transport: Arc<dyn Transport>,
    finished: CancellationToken,
) {
    // Fires on normal exit and on abort alike
    let _finished = finished.drop_guard();

    while let Some(request) = transport.receive().await {
        if let Some(response) = handler.handle_request(request).await {
            if let Err(e) = transport.send(&response).await {
                warn!("Failed to send MCP response: {}", e);
                break;
            }
        }
    }
    debug!("MCP serve loop finished");
}

/// Builds an isolated [`McpServer`] for every new connection.
#[derive(Clone)]
pub struct ServerFactory {
    identity: ServerIdentity,
    tools: ToolRegistry,
}

impl ServerFactory {
    pub fn new(identity: ServerIdentity, tools: ToolRegistry) -> Self {
        Self { identity, tools }
    }

    pub fn create(&self) -> McpServer {
        McpServer::new(McpHandler::new(self.identity.clone(), self.tools.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::StdioTransport;
    use crate::tools::tests::FakeLookup;
    use serde_json::{json, Value};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn factory() -> ServerFactory {
        ServerFactory::new(
            ServerIdentity::default(),
            ToolRegistry::new(Arc::new(FakeLookup::Records(vec![
                json!({"name": {"common": "Japan"}}),
            ]))),
        )
    }

    #[tokio::test]
    async fn test_serves_requests_in_order() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let server = factory().create();
        server
            .connect(Arc::new(StdioTransport::with_io(server_in, server_out)))
            .await
            .unwrap();

        client_in
            .write_all(
                concat!(
                    r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
                    "\n",
                    r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                    "\n",
                    r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_country_data","arguments":{"countryName":"Japan"}}}"#,
                    "\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let first: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert_eq!(
            second["result"]["structuredContent"]["data"]["name"]["common"],
            "Japan"
        );

        drop(client_in);
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let server = factory().create();
        server
            .connect(Arc::new(StdioTransport::with_io(
                tokio::io::empty(),
                tokio::io::sink(),
            )))
            .await
            .unwrap();
        let err = server
            .connect(Arc::new(StdioTransport::with_io(
                tokio::io::empty(),
                tokio::io::sink(),
            )))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::AlreadyConnected));
    }

    #[tokio::test]
    async fn test_close_without_connection_fails() {
        let server = factory().create();
        assert!(matches!(server.close().await, Err(ServerError::NotConnected)));
    }

    #[tokio::test]
    async fn test_close_stops_serving() {
        let (_client_in, server_in) = duplex(1024);
        let server = factory().create();
        server
            .connect(Arc::new(StdioTransport::with_io(server_in, tokio::io::sink())))
            .await
            .unwrap();
        assert!(server.is_connected());

        server.close().await.unwrap();
        assert!(!server.is_connected());
        assert!(matches!(server.close().await, Err(ServerError::NotConnected)));
    }

    #[tokio::test]
    async fn test_factory_creates_independent_servers() {
        let factory = factory();
        let a = factory.create();
        let b = factory.create();
        a.connect(Arc::new(StdioTransport::with_io(
            tokio::io::empty(),
            tokio::io::sink(),
        )))
        .await
        .unwrap();
        assert!(a.is_connected());
        assert!(!b.is_connected());
    }
}
