//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::config::DEFAULT_SUBSCRIBER_BUFFER;
use crate::registry::RegistryConfig;
use crate::store::{DEFAULT_RETENTION, MAX_HISTORY_LIMIT};

/// Default route prefix
pub const DEFAULT_ROUTE_PREFIX: &str = "/api";

/// Shortest accepted timer period
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path prefix all routes are mounted under ("" or "/" for none)
    pub route_prefix: String,

    /// Maximum events returned by a history query
    pub history_limit: usize,

    /// How long events stay queryable
    pub retention: Duration,

    /// Journal file for durable storage (None = in-memory store)
    pub journal_path: Option<PathBuf>,

    /// Per-subscriber queue depth before the subscriber is evicted
    pub subscriber_buffer: usize,

    /// Interval between SSE keep-alive comments
    pub keep_alive_interval: Duration,

    /// Maximum accepted webhook body size in bytes
    pub max_body_size: usize,

    /// Maximum concurrent event streams (0 = unlimited)
    pub max_connections: usize,

    /// Allowed CORS origin (None = any origin)
    pub cors_origin: Option<String>,

    /// Interval between expired-event sweeps
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            history_limit: MAX_HISTORY_LIMIT,
            retention: DEFAULT_RETENTION,
            journal_path: None,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            keep_alive_interval: Duration::from_secs(15),
            max_body_size: 1024 * 1024, // 1MB
            max_connections: 0,         // Unlimited
            cors_origin: None,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the route prefix
    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    /// Set the history limit (capped at 50)
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        self
    }

    /// Set the retention window
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Persist events to a journal file
    pub fn journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    /// Set the per-subscriber queue depth
    pub fn subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size.max(1);
        self
    }

    /// Set the SSE keep-alive interval (at least 1ms)
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Set the maximum webhook body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set maximum concurrent event streams
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Restrict CORS to a single origin
    pub fn cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Set the expired-event sweep interval (at least 1ms)
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Route prefix normalized to "" or "/segment" without trailing slash
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.route_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Registry configuration derived from these options
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default().subscriber_buffer(self.subscriber_buffer)
    }
}
