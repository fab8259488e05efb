//! Tool server connection lifecycle management.
//!
//! Owns one connection instance per server: connect, discover, monitor,
//! reconnect with capped exponential backoff, disconnect. Also hosts the
//! execution proxy and the health monitor, both of which read the same
//! connection map.
//!
//! Consistency rule: the tool registry's entries for a server always equal
//! the tool set of that server's live instance. Registry mutation happens
//! only while the connection map's write lock is held, and every async
//! connect/discovery completion re-checks a per-connect generation so a
//! racing disconnect is never undone by a stale result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use toolgrid_core::{
    ConnectionState, ErrorReport, ErrorSink, HealthReport, HubError, ServerDefinition,
    ToolDescriptor, ToolOutcome, ToolTransport, TransportFactory,
};

use crate::backoff::BackoffPolicy;
use crate::registry::ToolRegistry;
use crate::servers::ServerRegistry;

/// Live connection to one tool server.
struct ConnectionInstance {
    /// Display name back-reference for log lines.
    server_name: String,
    /// Current lifecycle state.
    state: ConnectionState,
    /// Transport handle, present once a connect has succeeded.
    transport: Option<Arc<dyn ToolTransport>>,
    /// Last successful connect time.
    last_connected_at: Option<DateTime<Utc>>,
    /// Consecutive connect failures since the last success.
    retry_count: u32,
    /// Tools currently known from this server.
    tools: Vec<ToolDescriptor>,
    /// Pending reconnect timer, if any. Aborted on disconnect.
    reconnect_timer: Option<JoinHandle<()>>,
    /// Monotonic token identifying the connect attempt that owns this
    /// instance's in-flight work.
    generation: u64,
    /// Per-request timeout copied from the definition.
    request_timeout: Duration,
}

impl ConnectionInstance {
    fn new(definition: &ServerDefinition, generation: u64) -> Self {
        Self {
            server_name: definition.name.clone(),
            state: ConnectionState::Connecting,
            transport: None,
            last_connected_at: None,
            retry_count: 0,
            tools: Vec::new(),
            reconnect_timer: None,
            generation,
            request_timeout: definition.timeout(),
        }
    }

    const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }
}

/// Point-in-time view of one connection instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// Server id.
    pub server_id: String,
    /// Server display name.
    pub server_name: String,
    /// Lifecycle state at snapshot time.
    pub state: ConnectionState,
    /// Consecutive connect failures since the last success.
    pub retry_count: u32,
    /// Last successful connect time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Number of tools known from this server.
    pub tool_count: usize,
}

/// Manager for tool server connections.
///
/// Servers connect, discover, and reconnect independently; no lock is held
/// across transport I/O. Within one server id, state transitions are
/// applied as an atomic unit under the connection map's write lock.
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, ConnectionInstance>>,
    servers: Arc<ServerRegistry>,
    registry: Arc<ToolRegistry>,
    factory: Arc<dyn TransportFactory>,
    errors: Arc<dyn ErrorSink>,
    backoff: BackoffPolicy,
    next_generation: AtomicU64,
}

impl ConnectionManager {
    /// Create a manager over the given collaborators.
    pub fn new(
        servers: Arc<ServerRegistry>,
        registry: Arc<ToolRegistry>,
        factory: Arc<dyn TransportFactory>,
        errors: Arc<dyn ErrorSink>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            servers,
            registry,
            factory,
            errors,
            backoff,
            next_generation: AtomicU64::new(1),
        }
    }

    /// Connect a registered server and discover its tools.
    ///
    /// Unknown ids, invalid definitions, and unsupported connection types
    /// are configuration errors: reported, never retried, and the server is
    /// left without a connection instance. Transport failures are reported
    /// as recoverable and arm a backoff timer.
    pub async fn connect(self: &Arc<Self>, id: &str) -> Result<(), HubError> {
        let Some(definition) = self.servers.get(id).await else {
            let err = HubError::UnknownServer(id.to_string());
            self.errors.report(ErrorReport::config(id, err.to_string()));
            return Err(err);
        };

        if let Err(message) = definition.validate() {
            self.clear_failed_instance(id).await;
            self.errors.report(ErrorReport::config(id, message.clone()));
            return Err(HubError::InvalidDefinition(message));
        }

        self.connect_instance(&definition, false).await
    }

    /// Shared connect path for manual connects and timer-driven retries.
    ///
    /// `from_timer` distinguishes the two: a timer retry must not resurrect
    /// a server whose instance was removed by a manual disconnect, and must
    /// not abort its own (already fired) timer handle.
    ///
    /// Boxed because the reconnect timer re-enters this function, making
    /// the future type recursive.
    fn connect_instance<'a>(
        self: &'a Arc<Self>,
        definition: &'a ServerDefinition,
        from_timer: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + 'a>> {
        Box::pin(async move {
            let id = definition.id.as_str();
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

            let stale_transport = {
                let mut connections = self.connections.write().await;
                let stale = if from_timer {
                    let Some(instance) = connections.get_mut(id) else {
                        // Manually disconnected while the timer was pending
                        return Ok(());
                    };
                    instance.reconnect_timer = None;
                    instance.state = ConnectionState::Connecting;
                    instance.generation = generation;
                    instance.request_timeout = definition.timeout();
                    None
                } else {
                    let instance = connections
                        .entry(id.to_string())
                        .or_insert_with(|| ConnectionInstance::new(definition, generation));
                    if let Some(timer) = instance.reconnect_timer.take() {
                        timer.abort();
                    }
                    instance.state = ConnectionState::Connecting;
                    instance.generation = generation;
                    // A manual connect restarts the state machine with a fresh
                    // retry budget (this is the only exit from Exhausted).
                    instance.retry_count = 0;
                    instance.request_timeout = definition.timeout();
                    instance.transport.take()
                };
                stale
            };
            if let Some(transport) = stale_transport {
                transport.close().await;
            }

            let transport = match self.factory.create(definition).await {
                Ok(transport) => transport,
                Err(error) if error.is_config() => {
                    self.clear_failed_instance(id).await;
                    self.errors.report(ErrorReport::config(id, error.to_string()));
                    return Err(HubError::from_transport(&error));
                }
                Err(error) => {
                    self.errors
                        .report(ErrorReport::network(id, error.to_string()));
                    self.schedule_reconnect(definition).await;
                    return Err(HubError::from_transport(&error));
                }
            };

            // Discovery is part of the connect cycle: a server we cannot list
            // tools from is not usefully connected.
            let tools = match timeout(definition.timeout(), transport.list_tools()).await {
                Ok(Ok(tools)) => tools,
                Ok(Err(error)) => {
                    transport.close().await;
                    self.errors.report(ErrorReport::network(
                        id,
                        format!("Tool discovery failed: {error}"),
                    ));
                    self.schedule_reconnect(definition).await;
                    return Err(HubError::DiscoveryFailed(error.to_string()));
                }
                Err(_) => {
                    transport.close().await;
                    self.errors
                        .report(ErrorReport::network(id, "Tool discovery timed out"));
                    self.schedule_reconnect(definition).await;
                    return Err(HubError::DiscoveryFailed("timed out".to_string()));
                }
            };

            let installed = {
                let mut connections = self.connections.write().await;
                match connections.get_mut(id) {
                    Some(instance) if instance.generation == generation => {
                        instance.transport = Some(Arc::clone(&transport));
                        instance.state = ConnectionState::Connected;
                        instance.retry_count = 0;
                        instance.last_connected_at = Some(Utc::now());
                        instance.tools.clone_from(&tools);
                        if let Some(timer) = instance.reconnect_timer.take() {
                            timer.abort();
                        }
                        self.registry.publish(id, &tools, Utc::now()).await;
                        true
                    }
                    // A disconnect (or newer connect) won the race; this
                    // result is stale and must not re-insert anything.
                    _ => false,
                }
            };

            if installed {
                tracing::info!(
                    server_id = %id,
                    server_name = %definition.name,
                    tool_count = tools.len(),
                    "Tool server connected"
                );
                Ok(())
            } else {
                transport.close().await;
                Ok(())
            }
        })
    }

    /// Arm a single cancellable reconnect timer, or mark the instance
    /// exhausted once the failure count reaches the definition's budget.
    async fn schedule_reconnect(self: &Arc<Self>, definition: &ServerDefinition) {
        let id = definition.id.as_str();
        let mut connections = self.connections.write().await;
        let Some(instance) = connections.get_mut(id) else {
            return;
        };

        if let Some(timer) = instance.reconnect_timer.take() {
            timer.abort();
        }
        instance.retry_count += 1;

        if instance.retry_count >= definition.max_retries {
            instance.state = ConnectionState::Exhausted;
            tracing::error!(
                server_id = %id,
                server_name = %instance.server_name,
                attempts = instance.retry_count,
                "Reconnect retries exhausted; manual connect required"
            );
            self.errors.report(
                ErrorReport::network(
                    id,
                    format!(
                        "Giving up after {} failed connect attempts",
                        instance.retry_count
                    ),
                )
                .terminal(),
            );
            return;
        }

        instance.state = ConnectionState::Reconnecting;
        let delay = self.backoff.delay(instance.retry_count);
        tracing::warn!(
            server_id = %id,
            retry_count = instance.retry_count,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Scheduling reconnect"
        );

        let manager = Arc::clone(self);
        let retry_definition = definition.clone();
        instance.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(error) = manager.connect_instance(&retry_definition, true).await {
                tracing::debug!(
                    server_id = %retry_definition.id,
                    error = %error,
                    "Reconnect attempt failed"
                );
            }
        }));
    }

    /// Disconnect a server. Idempotent: a no-op when no instance exists.
    ///
    /// Removes the instance, cancels any pending reconnect timer, removes
    /// every registry entry owned by the server, and closes the transport.
    pub async fn disconnect(&self, id: &str) {
        let removed = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(id);
            if removed.is_some() {
                self.registry.remove_server(id).await;
            }
            removed
        };

        let Some(mut instance) = removed else {
            return;
        };
        if let Some(timer) = instance.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(transport) = instance.transport.take() {
            transport.close().await;
        }
        tracing::info!(server_id = %id, "Tool server disconnected");
    }

    /// Disconnect every server with a live instance. Leaves zero pending
    /// reconnect timers behind.
    pub async fn disconnect_all(&self) {
        let ids: Vec<String> = {
            let connections = self.connections.read().await;
            connections.keys().cloned().collect()
        };
        for id in ids {
            self.disconnect(&id).await;
        }
    }

    /// Re-discover a connected server's tools.
    ///
    /// On success the known tool set is replaced wholesale and republished.
    /// On failure the previous tool set is left untouched; discovery will
    /// run again on the next reconnect cycle.
    pub async fn discover(&self, id: &str) -> Result<usize, HubError> {
        let handle = {
            let connections = self.connections.read().await;
            connections.get(id).and_then(|instance| {
                instance
                    .transport
                    .clone()
                    .filter(|_| instance.is_connected())
                    .map(|transport| (transport, instance.generation, instance.request_timeout))
            })
        };

        let Some((transport, generation, request_timeout)) = handle else {
            return Err(HubError::DiscoveryFailed(format!(
                "Server not connected: {id}"
            )));
        };

        let tools = match timeout(request_timeout, transport.list_tools()).await {
            Ok(Ok(tools)) => tools,
            Ok(Err(error)) => {
                self.errors.report(ErrorReport::network(
                    id,
                    format!("Tool discovery failed: {error}"),
                ));
                return Err(HubError::DiscoveryFailed(error.to_string()));
            }
            Err(_) => {
                self.errors
                    .report(ErrorReport::network(id, "Tool discovery timed out"));
                return Err(HubError::DiscoveryFailed("timed out".to_string()));
            }
        };

        let mut connections = self.connections.write().await;
        match connections.get_mut(id) {
            Some(instance) if instance.generation == generation => {
                instance.tools.clone_from(&tools);
                self.registry.publish(id, &tools, Utc::now()).await;
                tracing::info!(server_id = %id, tool_count = tools.len(), "Tools re-discovered");
                Ok(tools.len())
            }
            // Disconnected (or reconnected) while listing; discard.
            _ => Err(HubError::DiscoveryFailed(format!(
                "Server not connected: {id}"
            ))),
        }
    }

    /// Route a tool call to the owning server.
    ///
    /// Never errors across this boundary: an absent connection, a remote
    /// failure, and a timeout all come back as a failed [`ToolOutcome`].
    /// A timeout is an ordinary call failure, not a connection event.
    pub async fn execute(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: HashMap<String, serde_json::Value>,
    ) -> ToolOutcome {
        let handle = {
            let connections = self.connections.read().await;
            connections.get(server_id).and_then(|instance| {
                instance
                    .transport
                    .clone()
                    .filter(|_| instance.is_connected())
                    .map(|transport| (transport, instance.request_timeout))
            })
        };

        let Some((transport, request_timeout)) = handle else {
            let message = format!("Server not connected: {server_id}");
            self.errors
                .report(ErrorReport::agent(server_id, message.clone()));
            return ToolOutcome::failure(message);
        };

        match timeout(request_timeout, transport.call_tool(tool_name, arguments)).await {
            Ok(Ok(outcome)) => {
                if !outcome.success {
                    self.errors.report(ErrorReport::agent(
                        server_id,
                        outcome
                            .error
                            .clone()
                            .unwrap_or_else(|| format!("Tool '{tool_name}' failed")),
                    ));
                }
                outcome
            }
            Ok(Err(error)) => {
                let message = format!("Tool '{tool_name}' failed: {error}");
                self.errors
                    .report(ErrorReport::agent(server_id, message.clone()));
                ToolOutcome::failure(message)
            }
            Err(_) => {
                let message = format!(
                    "Tool '{tool_name}' timed out after {}ms",
                    request_timeout.as_millis()
                );
                self.errors
                    .report(ErrorReport::agent(server_id, message.clone()));
                ToolOutcome::failure(message)
            }
        }
    }

    /// Tools known from a server's live connection. A disconnected server
    /// yields an empty collection regardless of what the registry shows.
    pub async fn server_tools(&self, id: &str) -> Vec<ToolDescriptor> {
        let connections = self.connections.read().await;
        connections
            .get(id)
            .filter(|instance| instance.is_connected())
            .map(|instance| instance.tools.clone())
            .unwrap_or_default()
    }

    /// Count live instances by connected/disconnected. Read-only: never
    /// triggers reconnects.
    pub async fn health_check(&self) -> HealthReport {
        let connections = self.connections.read().await;
        let total = connections.len();
        let healthy = connections
            .values()
            .filter(|instance| instance.is_connected())
            .count();
        HealthReport {
            healthy,
            unhealthy: total - healthy,
            total,
        }
    }

    /// Snapshot of one instance, if present.
    pub async fn snapshot(&self, id: &str) -> Option<ConnectionSnapshot> {
        let connections = self.connections.read().await;
        connections.get(id).map(|instance| ConnectionSnapshot {
            server_id: id.to_string(),
            server_name: instance.server_name.clone(),
            state: instance.state,
            retry_count: instance.retry_count,
            last_connected_at: instance.last_connected_at,
            tool_count: instance.tools.len(),
        })
    }

    /// Drop a half-initialized instance after a configuration failure,
    /// leaving the server uninitialized until its definition is fixed.
    async fn clear_failed_instance(&self, id: &str) {
        let removed = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(id);
            if removed.is_some() {
                self.registry.remove_server(id).await;
            }
            removed
        };
        if let Some(mut instance) = removed {
            if let Some(timer) = instance.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(transport) = instance.transport.take() {
                transport.close().await;
            }
        }
    }
}
