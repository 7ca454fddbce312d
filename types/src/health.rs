//! Health check payload.

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests
    pub status: String,
    /// RFC 3339 timestamp of the response
    pub timestamp: String,
    /// Seconds since the server started
    pub uptime: f64,
    /// Number of live SSE sessions
    pub sessions: usize,
}
