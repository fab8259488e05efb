#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod backoff;
pub mod manager;
pub mod registry;
pub(crate) mod rpc;
pub mod servers;
pub mod service;
pub mod transport;

// Re-export domain types and ports from core for convenience
pub use toolgrid_core::{
    ConnectionState, ConnectionType, ErrorCategory, ErrorReport, ErrorSeverity, ErrorSink,
    HealthReport, HubError, LogSink, NoopSink, ServerDefinition, ToolDescriptor, ToolEntry,
    ToolKey, ToolOutcome, ToolTransport, TransportError, TransportFactory,
};

// Re-export this crate's public types
pub use backoff::BackoffPolicy;
pub use manager::{ConnectionManager, ConnectionSnapshot};
pub use registry::ToolRegistry;
pub use servers::ServerRegistry;
pub use service::ToolHub;
pub use transport::DefaultTransportFactory;

// Silence unused dev-dependency warnings; the async assertions live in the
// integration tests
#[cfg(test)]
use tokio_test as _;
