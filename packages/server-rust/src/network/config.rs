//! HTTP transport configuration.

use std::time::Duration;

/// Default cap on request body size (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound on health requests, answered with 408. Dispatch routes
    /// are bounded by native deadlines instead.
    pub request_timeout: Duration,
    /// Larger request bodies are answered with 413.
    pub max_body_bytes: usize,
    /// How long shutdown waits for in-flight dispatches.
    pub drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            drain_timeout: Duration::from_secs(30),
        }
    }
}
