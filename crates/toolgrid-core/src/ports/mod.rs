//! Ports: the traits and error types the hub is wired through.

mod error_sink;
mod hub_error;
mod transport;

pub use error_sink::{
    ErrorCategory, ErrorReport, ErrorSeverity, ErrorSink, LogSink, NoopSink,
};
pub use hub_error::HubError;
pub use transport::{ToolTransport, TransportError, TransportFactory};
