//! JSON-RPC 2.0 wire shapes shared by the default transports.
//!
//! Reference: <https://www.jsonrpc.org/specification>

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use toolgrid_core::{ToolDescriptor, ToolOutcome, TransportError};

/// JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    #[allow(dead_code)] // Required by serde; checked implicitly by parse
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// A notification has no id and expects no response.
pub(crate) fn notification(method: &str, params: Option<Value>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params.unwrap_or_else(|| json!({})),
    })
}

/// Parameters for the session-establishing `initialize` request.
pub(crate) fn initialize_params() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "clientInfo": {
            "name": "toolgrid",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {},
    })
}

/// Extract the result from a response, surfacing remote errors.
pub(crate) fn into_result(response: JsonRpcResponse) -> Result<Value, TransportError> {
    if let Some(error) = response.error {
        return Err(TransportError::Remote {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| TransportError::Protocol("Missing result in response".to_string()))
}

/// Tool shape returned by `tools/list`.
#[derive(Debug, Deserialize)]
struct RemoteTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    input_schema: Option<Value>,
}

/// Decode a `tools/list` result into descriptors.
pub(crate) fn parse_tool_list(result: &Value) -> Result<Vec<ToolDescriptor>, TransportError> {
    let tools_value = result.get("tools").cloned().unwrap_or_else(|| json!([]));
    let remote: Vec<RemoteTool> = serde_json::from_value(tools_value)?;

    Ok(remote
        .into_iter()
        .map(|t| ToolDescriptor {
            name: t.name,
            description: t.description,
            input_schema: t.input_schema,
        })
        .collect())
}

/// Decode a `tools/call` result (content array plus `isError` flag).
pub(crate) fn parse_call_result(result: &Value) -> ToolOutcome {
    let content = result.get("content").cloned().unwrap_or_else(|| json!([]));
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_error {
        let message = content
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        ToolOutcome::failure(message)
    } else {
        ToolOutcome::success(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(1, "tools/list", None);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"tools/list\""));
        assert!(!json.contains("params")); // Omitted when None
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#;
        let response: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, Some(1));
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_remote_error_surfaced() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid Request"}}"#;
        let response: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = into_result(response).unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: -32600, .. }));
    }

    #[test]
    fn test_parse_tool_list() {
        let result = json!({
            "tools": [
                {"name": "search", "description": "Find things",
                 "inputSchema": {"type": "object"}},
                {"name": "fetch"}
            ]
        });
        let tools = parse_tool_list(&result).unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "search");
        assert!(tools[0].input_schema.is_some());
        assert!(tools[1].description.is_none());
    }

    #[test]
    fn test_parse_call_result_error_flag() {
        let result = json!({
            "content": [{"type": "text", "text": "division by zero"}],
            "isError": true
        });
        let outcome = parse_call_result(&result);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("division by zero"));

        let ok = parse_call_result(&json!({"content": [{"type": "text", "text": "42"}]}));
        assert!(ok.success);
    }
}
