//! Centralized error/log sink port.
//!
//! Every failure path in the hub (connect, discovery, execution, retry
//! exhaustion) is routed through this collaborator with a category, a
//! severity, and a recoverable flag. The hub never silently drops an error.

use serde::{Deserialize, Serialize};

/// Categories of reported failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connect failure, discovery RPC failure or timeout. Recoverable;
    /// drives backoff scheduling.
    Network,
    /// Unsupported connection type or malformed server definition. Not
    /// retried until the definition is fixed.
    Config,
    /// Tool execution failure or timeout. Returned to the caller as a
    /// structured failure.
    Agent,
}

/// Severity of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Expected, transient condition.
    Warning,
    /// Terminal condition for the affected server.
    Error,
}

/// A single failure report sent to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Id of the affected server (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Failure category.
    pub category: ErrorCategory,

    /// Failure severity.
    pub severity: ErrorSeverity,

    /// Whether the subsystem will recover on its own (or the caller may
    /// simply retry).
    pub recoverable: bool,

    /// Human-readable message.
    pub message: String,
}

impl ErrorReport {
    /// Create a recoverable network report.
    pub fn network(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            category: ErrorCategory::Network,
            severity: ErrorSeverity::Warning,
            recoverable: true,
            message: message.into(),
        }
    }

    /// Create a configuration report. Not recoverable until the definition
    /// is fixed.
    pub fn config(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            category: ErrorCategory::Config,
            severity: ErrorSeverity::Error,
            recoverable: false,
            message: message.into(),
        }
    }

    /// Create a recoverable agent (tool execution) report.
    pub fn agent(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            category: ErrorCategory::Agent,
            severity: ErrorSeverity::Warning,
            recoverable: true,
            message: message.into(),
        }
    }

    /// Mark this report terminal (retry exhaustion).
    #[must_use]
    pub const fn terminal(mut self) -> Self {
        self.severity = ErrorSeverity::Error;
        self.recoverable = false;
        self
    }
}

/// Trait for routing failure reports to a centralized sink.
///
/// Implementations handle transport details (channels, UI events, log
/// aggregation). `report` must not block.
pub trait ErrorSink: Send + Sync {
    /// Deliver a failure report.
    fn report(&self, report: ErrorReport);

    /// Clone this sink into a boxed trait object.
    ///
    /// This enables cloning of `Arc<dyn ErrorSink>` consumers without
    /// requiring the underlying type to implement Clone.
    fn clone_box(&self) -> Box<dyn ErrorSink>;
}

/// A no-op sink for tests and contexts without a listener.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Create a new no-op sink.
    pub const fn new() -> Self {
        Self
    }
}

impl ErrorSink for NoopSink {
    fn report(&self, _report: ErrorReport) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn ErrorSink> {
        Box::new(self.clone())
    }
}

/// Default sink that routes reports to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a new logging sink.
    pub const fn new() -> Self {
        Self
    }
}

impl ErrorSink for LogSink {
    fn report(&self, report: ErrorReport) {
        match report.severity {
            ErrorSeverity::Warning => tracing::warn!(
                server_id = ?report.server_id,
                category = ?report.category,
                recoverable = report.recoverable,
                "{}",
                report.message
            ),
            ErrorSeverity::Error => tracing::error!(
                server_id = ?report.server_id,
                category = ?report.category,
                recoverable = report.recoverable,
                "{}",
                report.message
            ),
        }
    }

    fn clone_box(&self) -> Box<dyn ErrorSink> {
        Box::new(self.clone())
    }
}
