//! Application state management.

use countries_mcp_types::MCP_MESSAGE_PATH;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::client::{CountryLookup, RestCountriesClient};
use crate::config::Config;
use crate::mcp::{ServerFactory, ServerIdentity, SessionManager};
use crate::tools::ToolRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Live SSE sessions
    sessions: SessionManager,
    /// Builds a protocol server per session
    factory: ServerFactory,
    /// When the server started, for the health uptime
    started_at: Instant,
}

impl AppState {
    /// Create state serving tools backed by the given lookup.
    pub fn new(lookup: Arc<dyn CountryLookup>) -> Self {
        let factory = ServerFactory::new(ServerIdentity::default(), ToolRegistry::new(lookup));
        let sessions = SessionManager::new(factory.clone(), MCP_MESSAGE_PATH);
        Self::from_parts(factory, sessions)
    }

    /// Create state around an existing session manager.
    pub fn from_parts(factory: ServerFactory, sessions: SessionManager) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions,
                factory,
                started_at: Instant::now(),
            }),
        }
    }

    /// Create state backed by the REST Countries API described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = RestCountriesClient::new(config.api_url.clone(), config.request_timeout)?;
        info!("Using REST Countries API at {}", client.base_url());
        Ok(Self::new(Arc::new(client)))
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    pub fn factory(&self) -> &ServerFactory {
        &self.inner.factory
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> f64 {
        self.inner.started_at.elapsed().as_secs_f64()
    }
}
