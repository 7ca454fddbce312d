//! Stdio transport - newline-delimited JSON-RPC over stdin/stdout.

use async_trait::async_trait;
use countries_mcp_types::{JsonRpcRequest, JsonRpcResponse};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::transport::{decode_error_response, decode_request, Transport, TransportError};

pub struct StdioTransport<R, W> {
    reader: Mutex<Lines<BufReader<R>>>,
    writer: Mutex<W>,
    shutdown: CancellationToken,
}

impl StdioTransport<Stdin, Stdout> {
    /// Transport over the process's standard input and output.
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport<Stdin, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader).lines()),
            writer: Mutex::new(writer),
            shutdown: CancellationToken::new(),
        }
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn start(&self) -> Result<(), TransportError> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn receive(&self) -> Option<JsonRpcRequest> {
        let mut reader = self.reader.lock().await;
        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                line = reader.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stdin closed");
                    return None;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    return None;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match decode_request(line.as_bytes()) {
                Ok(request) => return Some(request),
                Err(e) => {
                    warn!("Discarding malformed message: {}", e);
                    let response = decode_error_response(&e);
                    if let Err(e) = self.send(&response).await {
                        error!("Failed to report malformed message: {}", e);
                    }
                }
            }
        }
    }

    async fn send(&self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let json = serde_json::to_string(response)?;
        self.write_line(&json).await
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countries_mcp_types::jsonrpc::PARSE_ERROR;
    use serde_json::{json, Value};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_reads_one_request_per_line() {
        let (mut client, server_in) = duplex(1024);
        let transport = StdioTransport::with_io(server_in, tokio::io::sink());

        client
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n")
            .await
            .unwrap();
        client
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();
        drop(client);

        assert_eq!(transport.receive().await.unwrap().method, "ping");
        let notification = transport.receive().await.unwrap();
        assert!(notification.is_notification());
        assert!(transport.receive().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let (mut client_in, server_in) = duplex(1024);
        let (server_out, client_out) = duplex(1024);
        let transport = StdioTransport::with_io(server_in, server_out);

        client_in
            .write_all(b"{oops\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n")
            .await
            .unwrap();

        let request = transport.receive().await.unwrap();
        assert_eq!(request.id, Some(json!(2)));

        let mut lines = BufReader::new(client_out).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_send_writes_newline_delimited_json() {
        let (server_out, client_out) = duplex(1024);
        let transport = StdioTransport::with_io(tokio::io::empty(), server_out);

        transport
            .send(&JsonRpcResponse::success(json!(1), json!({"ok": true})))
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["result"]["ok"], true);
    }

    #[tokio::test]
    async fn test_close_stops_receiving() {
        let (_client, server_in) = duplex(1024);
        let transport = StdioTransport::with_io(server_in, tokio::io::sink());
        transport.close().await;
        assert!(transport.receive().await.is_none());
        assert!(transport.start().await.is_err());
    }
}
