//! Service-level error types for the hub.

use thiserror::Error;

use super::{ErrorCategory, TransportError};

/// Domain-specific errors for hub operations.
///
/// These cover the register/connect/discover surface. Tool execution is
/// deliberately absent: the execution proxy returns a structured
/// [`crate::domain::ToolOutcome`] and never errors across its boundary.
#[derive(Debug, Error)]
pub enum HubError {
    /// A server with the same id is already registered.
    #[error("Server already registered: {0}")]
    DuplicateServer(String),

    /// No server with the given id is registered.
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// The server definition failed validation.
    #[error("Invalid server definition: {0}")]
    InvalidDefinition(String),

    /// The configured connection type has no transport.
    #[error("Unsupported connection type: {0}")]
    UnsupportedTransport(String),

    /// Transport-level connect failure. A reconnect has been scheduled
    /// unless retries are exhausted.
    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    /// Tool discovery failed; the previous tool set is left untouched.
    #[error("Tool discovery failed: {0}")]
    DiscoveryFailed(String),
}

impl HubError {
    /// Build the appropriate error for a failed factory `create`.
    #[must_use]
    pub fn from_transport(error: &TransportError) -> Self {
        match error {
            TransportError::Unsupported(t) => Self::UnsupportedTransport(t.clone()),
            other => Self::ConnectFailed(other.to_string()),
        }
    }
}

impl From<&HubError> for ErrorCategory {
    fn from(error: &HubError) -> Self {
        match error {
            HubError::DuplicateServer(_)
            | HubError::UnknownServer(_)
            | HubError::InvalidDefinition(_)
            | HubError::UnsupportedTransport(_) => Self::Config,
            HubError::ConnectFailed(_) | HubError::DiscoveryFailed(_) => Self::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ErrorCategory::from(&HubError::UnsupportedTransport("x".to_string())),
            ErrorCategory::Config
        );
        assert_eq!(
            ErrorCategory::from(&HubError::ConnectFailed("refused".to_string())),
            ErrorCategory::Network
        );
    }

    #[test]
    fn test_from_transport() {
        let err = HubError::from_transport(&TransportError::Unsupported("sse".to_string()));
        assert!(matches!(err, HubError::UnsupportedTransport(_)));

        let err = HubError::from_transport(&TransportError::Timeout);
        assert!(matches!(err, HubError::ConnectFailed(_)));
    }
}
