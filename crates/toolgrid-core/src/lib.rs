#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    ConnectionState, ConnectionType, HealthReport, ServerDefinition, ToolDescriptor, ToolEntry,
    ToolKey, ToolOutcome, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS,
};
pub use ports::{
    ErrorCategory, ErrorReport, ErrorSeverity, ErrorSink, HubError, LogSink, NoopSink,
    ToolTransport, TransportError, TransportFactory,
};

// Silence unused dev-dependency warnings for the async test harness
#[cfg(test)]
use tokio as _;
