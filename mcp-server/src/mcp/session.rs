//! MCP session management.
//!
//! Each SSE connection owns one session: a protocol server bound to its own
//! [`SseTransport`]. The table below is the only long-lived owner of those
//! pairs. A session leaves the table exactly once, when its transport closes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::server::{McpServer, ServerError, ServerFactory};
use super::sse::{SseStream, SseTransport};
use super::transport::{Transport, TransportError};

/// Lifecycle of a session. Teardown runs only on the `Open -> Closing` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closing,
    Closed,
}

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Failed to establish SSE connection: {0}")]
    Connect(#[source] ServerError),

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error("Failed to process message: {0}")]
    Message(#[from] TransportError),
}

/// An MCP session.
pub struct Session {
    server: McpServer,
    transport: Arc<SseTransport>,
    created_at: Instant,
    lifecycle: Mutex<Lifecycle>,
}

impl Session {
    fn new(server: McpServer, transport: Arc<SseTransport>) -> Self {
        Self {
            server,
            transport,
            created_at: Instant::now(),
            lifecycle: Mutex::new(Lifecycle::Open),
        }
    }

    #[cfg(test)]
    fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    /// Get the session age in seconds.
    pub fn age_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    /// Claim the right to tear this session down.
    fn begin_close(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle == Lifecycle::Open {
            *lifecycle = Lifecycle::Closing;
            true
        } else {
            false
        }
    }

    fn finish_close(&self) {
        *self.lifecycle.lock() = Lifecycle::Closed;
    }
}

/// Builds the SSE transport for a new session from the announced message path.
pub type TransportBuilder = Arc<dyn Fn(&str) -> (Arc<SseTransport>, SseStream) + Send + Sync>;

/// Manager for MCP sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    factory: ServerFactory,
    message_path: String,
    open_transport: TransportBuilder,
    /// Set by `close_all`; no session opens afterwards
    shutting_down: Arc<AtomicBool>,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// `message_path` is announced to clients as the URL to post messages to.
    pub fn new(factory: ServerFactory, message_path: impl Into<String>) -> Self {
        Self::with_transport_builder(
            factory,
            message_path,
            Arc::new(|path: &str| SseTransport::new(path)),
        )
    }

    /// Create a session manager whose transports come from `open_transport`.
    pub fn with_transport_builder(
        factory: ServerFactory,
        message_path: impl Into<String>,
        open_transport: TransportBuilder,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            factory,
            message_path: message_path.into(),
            open_transport,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open a new session and return its ID with the event stream for the response body.
    pub async fn open_session(&self) -> Result<(String, SseStream), SessionError> {
        let (transport, stream) = (self.open_transport)(self.message_path.as_str());
        let session_id = transport.session_id().to_string();
        let session = Arc::new(Session::new(self.factory.create(), transport.clone()));

        {
            let mut sessions = self.sessions.write().await;
            if self.shutting_down.load(Ordering::Acquire) {
                return Err(SessionError::ShuttingDown);
            }
            sessions.insert(session_id.clone(), session.clone());
        }

        if let Err(e) = session.server.connect(transport.clone()).await {
            self.sessions.write().await.remove(&session_id);
            session.finish_close();
            transport.close().await;
            error!("Failed to start SSE connection {}: {}", session_id, e);
            return Err(SessionError::Connect(e));
        }

        // Tear the session down whichever side closes the transport.
        // The stream is still held here, so no disconnect can precede this.
        let manager = self.clone();
        let watched = transport.clone();
        let watched_id = session_id.clone();
        tokio::spawn(async move {
            watched.closed().await;
            manager.close_session(&watched_id).await;
        });

        info!("Created MCP session: {}", session_id);
        Ok((session_id, stream))
    }

    /// Deliver a posted message to the session's transport.
    pub async fn route_message(&self, id: &str, body: &[u8]) -> Result<(), SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        session.transport.handle_post_message(body).await?;
        Ok(())
    }

    /// Tear a session down. Returns `false` if it was already closing or gone.
    pub async fn close_session(&self, id: &str) -> bool {
        let session = {
            let mut sessions = self.sessions.write().await;
            let claimed = sessions.get(id).is_some_and(|s| s.begin_close());
            if claimed {
                sessions.remove(id)
            } else {
                None
            }
        };

        let Some(session) = session else {
            debug!("MCP session {} already closed", id);
            return false;
        };

        if let Err(e) = session.server.close().await {
            warn!("Error closing server for session {}: {}", id, e);
        }
        // Covers a session closed before its server connected
        session.transport.close().await;
        session.finish_close();
        info!(
            "Closed MCP session: {} (age: {}s)",
            id,
            session.age_secs()
        );
        true
    }

    /// Close every live session and refuse new ones from now on.
    pub async fn close_all(&self) -> usize {
        self.shutting_down.store(true, Ordering::Release);
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        let mut closed = 0;
        for id in ids {
            if self.close_session(&id).await {
                closed += 1;
            }
        }
        closed
    }

    /// Check if a session exists.
    pub async fn session_exists(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Get the number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
