//! Tool server domain types.
//!
//! A server definition is owned by the external caller that registers it;
//! this subsystem only reads it and tracks connection-state side effects.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-request timeout for a server, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of connect attempts before a server is marked exhausted.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Type of connection used to reach a tool server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Streaming HTTP server - JSON-RPC requests over POST
    #[default]
    Streaming,
    /// Socket server - newline-delimited JSON-RPC over TCP
    Socket,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streaming => write!(f, "streaming"),
            Self::Socket => write!(f, "socket"),
        }
    }
}

/// Runtime state of a live connection instance.
///
/// A manually disconnected server has no connection instance at all, so
/// there is no variant for it here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Initial connect attempt in flight
    #[default]
    Connecting,
    /// Connected and serving tool calls
    Connected,
    /// Waiting on a backoff timer before the next connect attempt
    Reconnecting,
    /// Retries exhausted - terminal until a manual connect
    Exhausted,
}

/// Definition of a tool-providing server.
///
/// Created by an external caller at registration time. The persistence of
/// definitions across restarts is the caller's responsibility - this
/// subsystem holds no disk state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Unique server identifier.
    pub id: String,

    /// User-friendly display name.
    pub name: String,

    /// Endpoint address. A URL for streaming servers, `host:port` for
    /// socket servers.
    pub endpoint: String,

    /// How to reach the server.
    pub connection_type: ConnectionType,

    /// Whether the server should be connected automatically on registration.
    pub enabled: bool,

    /// Per-request timeout in milliseconds (bounds discovery and tool calls).
    pub timeout_ms: u64,

    /// Connect failures tolerated before the server is marked exhausted.
    pub max_retries: u32,
}

impl ServerDefinition {
    /// Create a streaming HTTP server definition.
    #[must_use]
    pub fn streaming(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            connection_type: ConnectionType::Streaming,
            enabled: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a socket server definition.
    #[must_use]
    pub fn socket(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            connection_type: ConnectionType::Socket,
            ..Self::streaming(id, name, endpoint)
        }
    }

    /// Set the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum connect retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the definition based on its connection type.
    ///
    /// Returns an error if required fields are missing or malformed for the
    /// connection type. Failures here are configuration errors: they are
    /// never retried until the definition is fixed.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Server id cannot be empty".to_string());
        }
        if self.name.is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        if self.endpoint.is_empty() {
            return Err(format!("Server '{}' requires an endpoint", self.id));
        }
        if self.timeout_ms == 0 {
            return Err(format!("Server '{}' timeout must be non-zero", self.id));
        }

        match self.connection_type {
            ConnectionType::Streaming => {
                // Streaming endpoints MUST be http(s) URLs
                if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
                    return Err(format!(
                        "Streaming server '{}' endpoint must be an http(s) URL: {}",
                        self.id, self.endpoint
                    ));
                }
                Ok(())
            }
            ConnectionType::Socket => {
                // Socket endpoints MUST be host:port
                if !self.endpoint.contains(':') {
                    return Err(format!(
                        "Socket server '{}' endpoint must be host:port: {}",
                        self.id, self.endpoint
                    ));
                }
                Ok(())
            }
        }
    }
}

/// On-demand count of connected vs disconnected servers.
///
/// Produced by the health monitor; reading it has no side effects and never
/// triggers reconnect attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Connection instances currently connected.
    pub healthy: usize,
    /// Connection instances present but not connected (connecting,
    /// reconnecting, or exhausted).
    pub unhealthy: usize,
    /// Total live connection instances.
    pub total: usize,
}
