//! Tool domain types.
//!
//! Tools are keyed by (server id, tool name): two servers may expose
//! identically named tools and must never overwrite each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool definition as discovered from a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (function name).
    pub name: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl ToolDescriptor {
    /// Create a new tool descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Composite registry key: (server id, tool name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolKey {
    /// Owning server id.
    pub server_id: String,
    /// Tool name as exposed by that server.
    pub name: String,
}

impl ToolKey {
    /// Create a composite key.
    pub fn new(server_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ToolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.server_id, self.name)
    }
}

/// A registry entry for a discovered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Owning server id.
    pub server_id: String,

    /// The discovered tool.
    pub tool: ToolDescriptor,

    /// Whether the tool is available to callers. Independent of connection
    /// state, and preserved across re-discovery for the same key.
    pub enabled: bool,

    /// When this entry was last discovered.
    pub discovered_at: DateTime<Utc>,
}

impl ToolEntry {
    /// Composite key for this entry.
    #[must_use]
    pub fn key(&self) -> ToolKey {
        ToolKey::new(self.server_id.clone(), self.tool.name.clone())
    }
}

/// Structured result of a tool invocation.
///
/// Execution never throws across the proxy boundary - remote failures and
/// timeouts come back as a failed outcome the caller can inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the call succeeded.
    pub success: bool,

    /// Result data (if success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Create a success outcome.
    #[must_use]
    pub const fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failure outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_composite_keys_distinguish_servers() {
        let a = ToolKey::new("alpha", "search");
        let b = ToolKey::new("beta", "search");
        assert_ne!(a, b);
        assert_eq!(a, ToolKey::new("alpha", "search"));
    }

    #[test]
    fn test_tool_descriptor_builders() {
        let tool = ToolDescriptor::new("search")
            .with_description("Full-text search")
            .with_input_schema(json!({"type": "object", "required": ["query"]}));
        assert_eq!(tool.name, "search");
        assert!(tool.description.is_some());
        assert!(tool.input_schema.is_some());
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = ToolOutcome::success(json!([{"type": "text", "text": "hi"}]));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let err = ToolOutcome::failure("boom");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert!(err.data.is_none());
    }

    #[test]
    fn test_outcome_serde_skips_absent_fields() {
        let json = serde_json::to_string(&ToolOutcome::failure("nope")).unwrap();
        assert!(!json.contains("data"));
        assert!(json.contains("\"error\":\"nope\""));
    }
}
