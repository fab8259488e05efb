//! Streaming HTTP transport: JSON-RPC requests over POST.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use async_trait::async_trait;
use toolgrid_core::{
    ServerDefinition, ToolDescriptor, ToolOutcome, ToolTransport, TransportError,
};

use crate::rpc;

/// JSON-RPC over HTTP POST. The connection itself is stateless; the
/// session is established by the `initialize` handshake at connect time.
pub struct StreamingTransport {
    http: reqwest::Client,
    endpoint: Url,
    request_id: AtomicU64,
}

impl StreamingTransport {
    /// Connect to a streaming server and perform the initialize handshake.
    pub(crate) async fn connect(
        definition: &ServerDefinition,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        let endpoint = Url::parse(&definition.endpoint).map_err(|e| {
            TransportError::Connect(format!("Invalid endpoint '{}': {e}", definition.endpoint))
        })?;

        let http = reqwest::Client::builder()
            .timeout(definition.timeout())
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let transport = Self {
            http,
            endpoint,
            request_id: AtomicU64::new(1),
        };

        transport
            .request("initialize", Some(rpc::initialize_params()))
            .await?;
        transport
            .notify("notifications/initialized", None)
            .await?;

        Ok(Arc::new(transport))
    }

    /// Send a JSON-RPC request and decode the response envelope.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = rpc::JsonRpcRequest::new(id, method, params);

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Protocol(format!(
                "Server returned HTTP {status}"
            )));
        }

        let parsed: rpc::JsonRpcResponse = response.json().await.map_err(map_reqwest_error)?;
        if parsed.id != Some(id) {
            return Err(TransportError::Protocol(format!(
                "Response id mismatch for method {method}"
            )));
        }
        rpc::into_result(parsed)
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        self.http
            .post(self.endpoint.clone())
            .json(&rpc::notification(method, params))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(())
    }
}

#[async_trait]
impl ToolTransport for StreamingTransport {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
        let result = self.request("tools/list", None).await?;
        rpc::parse_tool_list(&result)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> Result<ToolOutcome, TransportError> {
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", Some(params)).await?;
        Ok(rpc::parse_call_result(&result))
    }

    async fn close(&self) {
        // HTTP is connectionless; nothing to tear down.
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Protocol(error.to_string())
    }
}
