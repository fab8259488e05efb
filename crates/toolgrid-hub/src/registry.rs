//! Composite-keyed tool registry.
//!
//! The single source of truth the rest of the application reads. Entries
//! are keyed by (server id, tool name) so identically named tools from
//! different servers coexist. Entries for a server are replaced wholesale
//! on discovery and removed in bulk on disconnect.
//!
//! Mutating operations are only called by the connection manager while it
//! holds its connection-map write lock; that serialization is what keeps
//! the registry consistent with live connection state.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use toolgrid_core::{ToolDescriptor, ToolEntry, ToolKey};

/// Process-wide store of discovered tools with per-tool enable flags.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<HashMap<ToolKey, ToolEntry>>,
    /// Keys the caller has explicitly disabled. Kept separately so the
    /// disable survives re-discovery and reconnect cycles for the same key.
    disabled: RwLock<HashSet<ToolKey>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a server's entries wholesale with a freshly discovered set.
    ///
    /// New entries start enabled unless their key was explicitly disabled
    /// by a prior `set_enabled` call.
    pub async fn publish(
        &self,
        server_id: &str,
        tools: &[ToolDescriptor],
        discovered_at: DateTime<Utc>,
    ) {
        let disabled = self.disabled.read().await;
        let mut entries = self.entries.write().await;

        entries.retain(|key, _| key.server_id != server_id);
        for tool in tools {
            let key = ToolKey::new(server_id, tool.name.clone());
            let enabled = !disabled.contains(&key);
            entries.insert(
                key,
                ToolEntry {
                    server_id: server_id.to_string(),
                    tool: tool.clone(),
                    enabled,
                    discovered_at,
                },
            );
        }
    }

    /// Remove every entry owned by the given server.
    pub async fn remove_server(&self, server_id: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| key.server_id != server_id);
    }

    /// Toggle a tool's availability. Unknown composite keys are a no-op.
    /// Connection state is untouched.
    pub async fn set_enabled(&self, server_id: &str, tool_name: &str, enabled: bool) {
        let key = ToolKey::new(server_id, tool_name);
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        entry.enabled = enabled;
        drop(entries);

        let mut disabled = self.disabled.write().await;
        if enabled {
            disabled.remove(&key);
        } else {
            disabled.insert(key);
        }
    }

    /// All enabled entries across every server known to the registry,
    /// connected or not. A server that lost its connection keeps its
    /// last-discovered entries visible until it is explicitly disconnected.
    pub async fn list_available(&self) -> Vec<ToolEntry> {
        let entries = self.entries.read().await;
        let mut available: Vec<ToolEntry> =
            entries.values().filter(|e| e.enabled).cloned().collect();
        available.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));
        available
    }

    /// Every entry owned by the given server, enabled or not.
    pub async fn server_entries(&self, server_id: &str) -> Vec<ToolEntry> {
        let entries = self.entries.read().await;
        let mut owned: Vec<ToolEntry> = entries
            .values()
            .filter(|e| e.server_id == server_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.tool.name.cmp(&b.tool.name));
        owned
    }

    /// Total number of entries. Used by consistency assertions in tests.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
