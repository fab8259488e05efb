//! Transport port for tool-server communication.
//!
//! The hub talks to servers exclusively through these traits. Adding a new
//! connection type means providing a new transport implementation and a new
//! factory branch - existing transports are never modified for it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{ServerDefinition, ToolDescriptor, ToolOutcome};

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to tool server: {0}")]
    Connect(String),

    #[error("Failed to communicate with tool server: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool server protocol error: {0}")]
    Protocol(String),

    #[error("Timeout waiting for tool server response")]
    Timeout,

    #[error("Tool server returned error: code={code}, message={message}")]
    Remote { code: i64, message: String },

    #[error("Transport not connected")]
    NotConnected,

    #[error("Unsupported connection type: {0}")]
    Unsupported(String),
}

impl TransportError {
    /// Whether this error is a configuration problem rather than a network
    /// condition. Configuration errors are never retried.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// A live client handle to one tool server.
///
/// Implementations must be safe to share across concurrent calls: the hub
/// clones the handle out of its connection map and invokes it without
/// holding any lock, and a cancelled call must not poison the connection.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// List the tools the server currently exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError>;

    /// Invoke a remote tool with the given arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> Result<ToolOutcome, TransportError>;

    /// Close the connection. Best-effort; must be idempotent.
    async fn close(&self);
}

/// Factory producing a connected transport for a server definition.
///
/// The default implementation in `toolgrid-hub` dispatches on
/// [`crate::domain::ConnectionType`]; callers may inject their own factory
/// (tests do) as long as it returns [`TransportError::Unsupported`] for
/// types it does not handle.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Create and connect a transport for the given definition.
    async fn create(
        &self,
        definition: &ServerDefinition,
    ) -> Result<Arc<dyn ToolTransport>, TransportError>;
}
