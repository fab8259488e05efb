//! In-memory server definition store.
//!
//! Definitions are owned by the external caller; persistence across
//! restarts is its responsibility. On process start the owner re-issues
//! `register_server`/`connect` for each previously-enabled server.

use std::collections::HashMap;
use tokio::sync::RwLock;

use toolgrid_core::{HubError, ServerDefinition};

/// Registry of server definitions, keyed by server id.
#[derive(Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<String, ServerDefinition>>,
}

impl ServerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition. Rejects duplicate ids.
    pub async fn register(&self, definition: ServerDefinition) -> Result<(), HubError> {
        let mut servers = self.servers.write().await;
        if servers.contains_key(&definition.id) {
            return Err(HubError::DuplicateServer(definition.id));
        }
        tracing::info!(server_id = %definition.id, server_name = %definition.name, "Registered tool server");
        servers.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Look up a definition by id.
    pub async fn get(&self, id: &str) -> Option<ServerDefinition> {
        self.servers.read().await.get(id).cloned()
    }

    /// All registered definitions. Empty when nothing is registered.
    pub async fn list(&self) -> Vec<ServerDefinition> {
        let servers = self.servers.read().await;
        let mut all: Vec<ServerDefinition> = servers.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Remove a definition. Returns the removed definition, if any.
    pub async fn remove(&self, id: &str) -> Option<ServerDefinition> {
        self.servers.write().await.remove(id)
    }
}
