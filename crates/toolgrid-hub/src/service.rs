//! High-level facade over the server registry, connection manager, and
//! tool registry.
//!
//! This is the API the rest of the application calls. It uses dependency
//! injection for the transport factory and the error sink so tests can
//! script both.

use std::collections::HashMap;
use std::sync::Arc;

use toolgrid_core::{
    ErrorSink, HealthReport, HubError, ServerDefinition, ToolDescriptor, ToolEntry, ToolOutcome,
    TransportFactory,
};

use crate::backoff::BackoffPolicy;
use crate::manager::{ConnectionManager, ConnectionSnapshot};
use crate::registry::ToolRegistry;
use crate::servers::ServerRegistry;
use crate::transport::DefaultTransportFactory;

/// Unified entry point for tool-server management.
pub struct ToolHub {
    servers: Arc<ServerRegistry>,
    registry: Arc<ToolRegistry>,
    manager: Arc<ConnectionManager>,
}

impl ToolHub {
    /// Create a hub with injected collaborators.
    pub fn new(factory: Arc<dyn TransportFactory>, errors: Arc<dyn ErrorSink>) -> Self {
        Self::with_backoff(factory, errors, BackoffPolicy::default())
    }

    /// Create a hub with an explicit backoff policy (tests shorten it).
    pub fn with_backoff(
        factory: Arc<dyn TransportFactory>,
        errors: Arc<dyn ErrorSink>,
        backoff: BackoffPolicy,
    ) -> Self {
        let servers = Arc::new(ServerRegistry::new());
        let registry = Arc::new(ToolRegistry::new());
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&servers),
            Arc::clone(&registry),
            factory,
            errors,
            backoff,
        ));
        Self {
            servers,
            registry,
            manager,
        }
    }

    /// Create a hub with the default transports (streaming HTTP, socket).
    pub fn with_default_transports(errors: Arc<dyn ErrorSink>) -> Self {
        Self::new(Arc::new(DefaultTransportFactory::new()), errors)
    }

    // =========================================================================
    // Server definition lifecycle
    // =========================================================================

    /// Register a server definition. Rejects duplicate ids.
    ///
    /// When the definition is enabled, a connect attempt is triggered in
    /// the background without blocking the caller.
    pub async fn register_server(&self, definition: ServerDefinition) -> Result<(), HubError> {
        let id = definition.id.clone();
        let enabled = definition.enabled;
        self.servers.register(definition).await?;

        if enabled {
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                if let Err(error) = manager.connect(&id).await {
                    tracing::warn!(server_id = %id, error = %error, "Initial connect failed");
                }
            });
        }
        Ok(())
    }

    /// Deregister a server: disconnect it, then remove its definition.
    pub async fn deregister_server(&self, id: &str) -> Result<(), HubError> {
        self.manager.disconnect(id).await;
        self.servers
            .remove(id)
            .await
            .map(|_| ())
            .ok_or_else(|| HubError::UnknownServer(id.to_string()))
    }

    /// Look up a server definition. `None` for unknown ids.
    pub async fn get_server(&self, id: &str) -> Option<ServerDefinition> {
        self.servers.get(id).await
    }

    /// All registered server definitions.
    pub async fn list_servers(&self) -> Vec<ServerDefinition> {
        self.servers.list().await
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Connect a registered server (also the manual exit from the
    /// exhausted state).
    pub async fn connect(&self, id: &str) -> Result<(), HubError> {
        self.manager.connect(id).await
    }

    /// Disconnect a server. Always a safe no-op on absent state.
    pub async fn disconnect(&self, id: &str) {
        self.manager.disconnect(id).await;
    }

    /// Disconnect every connected server; used at process shutdown.
    pub async fn disconnect_all(&self) {
        self.manager.disconnect_all().await;
    }

    /// Alias for [`Self::disconnect_all`].
    pub async fn shutdown(&self) {
        self.disconnect_all().await;
    }

    /// Re-discover a connected server's tools.
    pub async fn discover(&self, id: &str) -> Result<usize, HubError> {
        self.manager.discover(id).await
    }

    // =========================================================================
    // Tool registry reads and toggles
    // =========================================================================

    /// Enabled tool entries across all servers known to the registry,
    /// connected or not (stale-but-informative policy).
    pub async fn list_available(&self) -> Vec<ToolEntry> {
        self.registry.list_available().await
    }

    /// Tools from a server's live connection only; empty when disconnected.
    pub async fn list_server_tools(&self, id: &str) -> Vec<ToolDescriptor> {
        self.manager.server_tools(id).await
    }

    /// Toggle a tool's availability without touching connection state.
    pub async fn set_enabled(&self, server_id: &str, tool_name: &str, enabled: bool) {
        self.registry.set_enabled(server_id, tool_name, enabled).await;
    }

    // =========================================================================
    // Execution and health
    // =========================================================================

    /// Invoke a tool on its owning server. Returns a structured outcome,
    /// never an error.
    pub async fn execute(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: HashMap<String, serde_json::Value>,
    ) -> ToolOutcome {
        self.manager.execute(server_id, tool_name, arguments).await
    }

    /// Connected/disconnected counts over live connection instances.
    pub async fn health_check(&self) -> HealthReport {
        self.manager.health_check().await
    }

    /// Snapshot of one connection instance, if present.
    pub async fn connection_snapshot(&self, id: &str) -> Option<ConnectionSnapshot> {
        self.manager.snapshot(id).await
    }
}
