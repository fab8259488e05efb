//! Socket transport: newline-delimited JSON-RPC over TCP.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use toolgrid_core::{
    ServerDefinition, ToolDescriptor, ToolOutcome, ToolTransport, TransportError,
};

use crate::rpc;

/// Non-response lines tolerated before a request is abandoned.
const MAX_SKIPPED_LINES: usize = 10;

struct SocketIo {
    writer: OwnedWriteHalf,
    reader: BufReader<OwnedReadHalf>,
}

/// One TCP connection carrying newline-delimited JSON-RPC.
///
/// The whole request/response cycle runs under a single lock so concurrent
/// callers cannot interleave their responses on the shared stream.
pub struct SocketTransport {
    io: Mutex<Option<SocketIo>>,
    request_id: AtomicU64,
    request_timeout: Duration,
}

impl SocketTransport {
    /// Connect to a socket server and perform the initialize handshake.
    pub(crate) async fn connect(
        definition: &ServerDefinition,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        let stream = timeout(definition.timeout(), TcpStream::connect(&definition.endpoint))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| {
                TransportError::Connect(format!(
                    "Failed to connect to '{}': {e}",
                    definition.endpoint
                ))
            })?;

        let (read_half, write_half) = stream.into_split();
        let transport = Self {
            io: Mutex::new(Some(SocketIo {
                writer: write_half,
                reader: BufReader::new(read_half),
            })),
            request_id: AtomicU64::new(1),
            request_timeout: definition.timeout(),
        };

        transport
            .request("initialize", Some(rpc::initialize_params()))
            .await?;
        transport.notify("notifications/initialized", None).await?;

        Ok(Arc::new(transport))
    }

    /// Send a request line and scan for the matching response line.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = rpc::JsonRpcRequest::new(id, method, params);
        let line = serde_json::to_string(&request)? + "\n";

        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let exchange = async {
            io.writer.write_all(line.as_bytes()).await?;
            io.writer.flush().await?;

            // Scan lines until a response with our id arrives; tolerate
            // blank lines and stray server output.
            for _ in 0..MAX_SKIPPED_LINES {
                let mut buf = String::new();
                let read = io.reader.read_line(&mut buf).await?;
                if read == 0 {
                    return Err(TransportError::Protocol(
                        "Server closed connection".to_string(),
                    ));
                }
                let trimmed = buf.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<rpc::JsonRpcResponse>(trimmed) {
                    Ok(response) if response.id == Some(id) => return rpc::into_result(response),
                    Ok(_) | Err(_) => {
                        tracing::debug!(line = trimmed, "Skipping unexpected line");
                    }
                }
            }

            Err(TransportError::Protocol(
                "No matching JSON-RPC response received".to_string(),
            ))
        };

        timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    /// Send a notification line (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let line = serde_json::to_string(&rpc::notification(method, params))? + "\n";
        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(TransportError::NotConnected)?;
        io.writer.write_all(line.as_bytes()).await?;
        io.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ToolTransport for SocketTransport {
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
        // Dropping the halves closes the stream; shut the writer down
        // first so the server sees EOF. Idempotent by construction.
        let mut guard = self.io.lock().await;
        if let Some(mut io) = guard.take() {
            let _ = io.writer.shutdown().await;
        }
    }
}
