//! SSE transport for a single MCP session.
//!
//! Server-to-client traffic goes out on a long-lived event stream; client
//! messages arrive through [`SseTransport::handle_post_message`].

use async_trait::async_trait;
use axum::response::sse::Event;
use countries_mcp_types::{JsonRpcRequest, JsonRpcResponse, SESSION_ID_PARAM};
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::transport::{decode_request, Transport, TransportError};

/// Capacity of the outbound event and inbound message queues.
const CHANNEL_CAPACITY: usize = 64;

/// An event written to the SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseMessage {
    /// URL the client must post its messages to.
    Endpoint(String),
    /// A serialized JSON-RPC message.
    Message(String),
}

impl SseMessage {
    pub fn into_event(self) -> Event {
        match self {
            SseMessage::Endpoint(url) => Event::default().event("endpoint").data(url),
            SseMessage::Message(json) => Event::default().event("message").data(json),
        }
    }
}

/// Outbound half handed to the HTTP response.
///
/// Dropping it (the client went away) closes the transport.
pub struct SseStream {
    messages: ReceiverStream<SseMessage>,
    _disconnect: DropGuard,
}

impl Stream for SseStream {
    type Item = SseMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.messages).poll_next(cx)
    }
}

/// SSE transport bound to one session.
pub struct SseTransport {
    session_id: String,
    message_path: String,
    started: AtomicBool,
    /// Taken on close so the event stream ends once drained
    outbound: Mutex<Option<mpsc::Sender<SseMessage>>>,
    inbound_tx: mpsc::Sender<JsonRpcRequest>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<JsonRpcRequest>>,
    shutdown: CancellationToken,
}

impl SseTransport {
    /// Create a transport with a fresh session ID, plus the stream feeding the response body.
    pub fn new(message_path: impl Into<String>) -> (Arc<Self>, SseStream) {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        let transport = Arc::new(Self {
            session_id: Uuid::new_v4().to_string(),
            message_path: message_path.into(),
            started: AtomicBool::new(false),
            outbound: Mutex::new(Some(event_tx)),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            shutdown: shutdown.clone(),
        });
        let stream = SseStream {
            messages: ReceiverStream::new(event_rx),
            _disconnect: shutdown.drop_guard(),
        };
        (transport, stream)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// URL announced in the `endpoint` event.
    pub fn endpoint(&self) -> String {
        format!(
            "{}?{}={}",
            self.message_path, SESSION_ID_PARAM, self.session_id
        )
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Close synchronously: stop receiving and end the event stream once drained.
    pub fn disconnect(&self) {
        self.shutdown.cancel();
        self.outbound.lock().take();
    }

    /// Resolves once the transport is closed from either side.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Accept a message posted by the client for this session.
    pub async fn handle_post_message(&self, body: &[u8]) -> Result<(), TransportError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(TransportError::NotStarted);
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let request = decode_request(body)?;
        debug!(
            "SSE session {}: received {}",
            self.session_id, request.method
        );
        self.inbound_tx
            .send(request)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn push(&self, message: SseMessage) -> Result<(), TransportError> {
        let sender = self
            .outbound
            .lock()
            .clone()
            .ok_or(TransportError::Closed)?;
        sender.send(message).await.map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyStarted);
        }
        self.push(SseMessage::Endpoint(self.endpoint())).await
    }

    async fn receive(&self) -> Option<JsonRpcRequest> {
        let mut inbound = self.inbound_rx.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => None,
            request = inbound.recv() => request,
        }
    }

    async fn send(&self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(response)?;
        self.push(SseMessage::Message(json)).await.inspect_err(|e| {
            warn!("SSE transport error for session {}: {}", self.session_id, e);
        })
    }

    async fn close(&self) {
        self.disconnect();
    }
}
