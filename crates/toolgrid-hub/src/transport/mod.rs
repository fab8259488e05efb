//! Default transport implementations and the factory that selects them.
//!
//! Adding a new connection type means adding one `ConnectionType` variant,
//! one transport module, and one factory branch here - existing transports
//! are never touched.

mod socket;
mod streaming;

pub use socket::SocketTransport;
pub use streaming::StreamingTransport;

use async_trait::async_trait;
use std::sync::Arc;

use toolgrid_core::{
    ConnectionType, ServerDefinition, ToolTransport, TransportError, TransportFactory,
};

/// Factory dispatching on [`ConnectionType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl DefaultTransportFactory {
    /// Create the default factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportFactory for DefaultTransportFactory {
    async fn create(
        &self,
        definition: &ServerDefinition,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        match definition.connection_type {
            ConnectionType::Streaming => StreamingTransport::connect(definition).await,
            ConnectionType::Socket => SocketTransport::connect(definition).await,
        }
    }
}
