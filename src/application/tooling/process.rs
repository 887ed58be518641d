use super::error::ToolInvokeError;
use super::interface::{ListingConnection, ListingConnector, ServerToolInfo};
use crate::config::ListingServerConfig;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2025-06-18";

/// Spawns one [`McpConnection`] per query from a fixed server configuration.
pub struct StdioConnector {
    server: ListingServerConfig,
}

impl StdioConnector {
    pub fn new(server: ListingServerConfig) -> Self {
        Self { server }
    }
}

#[async_trait]
impl ListingConnector for StdioConnector {
    type Connection = McpConnection;

    async fn connect(&self) -> Result<McpConnection, ToolInvokeError> {
        McpConnection::open(self.server.clone()).await
    }
}

/// A single-use MCP connection over the stdio transport.
///
/// `open` spawns the server subprocess, runs the `initialize` handshake and
/// captures the tool catalogue. `close` kills the child and fails any request
/// still in flight. The connection is not restarted after close.
#[derive(Clone)]
pub struct McpConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    server: ListingServerConfig,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>>,
    id_counter: AtomicU64,
    instructions: AsyncMutex<Option<String>>,
    tool_cache: AsyncMutex<Vec<ServerToolInfo>>,
}

impl McpConnection {
    /// Spawn the listing server and complete the MCP handshake. A partially
    /// established connection (spawned but failing the handshake) is torn
    /// down before the error is returned.
    pub async fn open(server: ListingServerConfig) -> Result<Self, ToolInvokeError> {
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                server,
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                instructions: AsyncMutex::new(None),
                tool_cache: AsyncMutex::new(Vec::new()),
            }),
        };

        connection.inner.spawn_process().await?;
        match connection.inner.initialize_sequence().await {
            Ok(()) => {
                info!(
                    server = %connection.inner.server.name,
                    "Listing server connection established"
                );
                Ok(connection)
            }
            Err(err) => {
                connection.inner.shutdown().await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ListingConnection for McpConnection {
    async fn tools(&self) -> Vec<ServerToolInfo> {
        self.inner.tool_cache.lock().await.clone()
    }

    async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.inner.send_request("tools/call", params).await
    }

    async fn close(&self) {
        self.inner.shutdown().await;
    }
}

impl ConnectionInner {
    async fn spawn_process(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let mut command = Command::new(&self.server.command);
        command
            .args(self.server.launch_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }
        for (key, value) in &self.server.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.server.name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        Ok(())
    }

    async fn initialize_sequence(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            *self.instructions.lock().await = Some(text.to_string());
        }
        self.send_notification("notifications/initialized", json!({}))
            .await?;

        self.refresh_tools().await?;
        Ok(())
    }

    async fn refresh_tools(&self) -> Result<(), ToolInvokeError> {
        let result = self.send_request("tools/list", json!({})).await?;
        let mut tools = Vec::new();
        if let Some(array) = result.get("tools").and_then(Value::as_array) {
            for tool in array {
                if let Some(name) = tool.get("name").and_then(Value::as_str) {
                    tools.push(ServerToolInfo {
                        name: name.to_string(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(|text| text.to_string()),
                        input_schema: tool.get("inputSchema").cloned(),
                    });
                }
            }
        }
        debug!(
            server = %self.server.name,
            tools = tools.len(),
            "Captured tool catalogue"
        );
        *self.tool_cache.lock().await = tools;
        Ok(())
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(item) = lines.next_line().await {
            let Some(raw) = item else { break };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            // npx and the server itself occasionally print ANSI status lines
            if trimmed.starts_with('\u{1b}') {
                debug!(
                    server = %self.server.name,
                    line = trimmed,
                    "skipping non-JSON log line from listing server"
                );
                continue;
            }
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => self.process_inbound_message(value).await,
                Err(source) => {
                    warn!(
                        server = %self.server.name,
                        line = raw,
                        %source,
                        "received invalid JSON from listing server"
                    );
                }
            }
        }

        // stdout closed: the child is gone, release whatever is left
        self.shutdown().await;
    }

    async fn process_inbound_message(&self, value: Value) {
        if let Some(id) = value.get("id").cloned() {
            if value.get("method").is_some() {
                self.handle_server_request(id, value).await;
            } else {
                self.handle_response(id, value).await;
            }
        } else if value.get("method").is_some() {
            self.handle_notification(value).await;
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else { return };

        let responder = {
            let mut pending = self.pending.lock().await;
            pending.remove(&key)
        };

        let Some(sender) = responder else {
            debug!(
                server = %self.server.name,
                response_id = key,
                "received response for unknown request"
            );
            return;
        };

        if let Some(error) = value.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let _ = sender.send(Err(ToolInvokeError::Rpc {
                server: self.server.name.clone(),
                code,
                message,
            }));
        } else {
            let result = value.get("result").cloned().unwrap_or(Value::Null);
            let _ = sender.send(Ok(result));
        }
    }

    async fn handle_server_request(&self, id: Value, value: Value) {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let outcome = match method {
            "ping" => self.send_response(id, json!({})).await,
            other => {
                warn!(
                    server = %self.server.name,
                    method = other,
                    "server sent unsupported request"
                );
                let error = json!({
                    "code": -32601,
                    "message": format!("client does not implement method '{other}'"),
                });
                self.send_error(id, error).await
            }
        };
        if let Err(err) = outcome {
            warn!(server = %self.server.name, %err, "failed to answer server request");
        }
    }

    async fn handle_notification(&self, value: Value) {
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            debug!(
                server = %self.server.name,
                method,
                "received notification from server"
            );
            if method == "notifications/tools/list_changed" {
                if let Err(err) = self.refresh_tools().await {
                    warn!(
                        server = %self.server.name,
                        %err,
                        "failed to refresh tool catalogue"
                    );
                }
            }
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: self.server.name.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        });
        self.write_message(&payload).await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": error
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| ToolInvokeError::Terminated {
                server: self.server.name.clone(),
            })?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .write_all(b"\n")
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    /// Kill the child, fail everything in flight, drop cached state.
    /// Idempotent: a second call finds nothing to release.
    async fn shutdown(&self) {
        *self.writer.lock().await = None;

        let child = self.child.lock().await.take();
        if let Some(mut running) = child {
            if let Err(err) = running.kill().await {
                debug!(
                    server = %self.server.name,
                    %err,
                    "failed to kill listing server process (may have already exited)"
                );
            }
            let _ = running.wait().await;
            info!(server = %self.server.name, "Listing server connection closed");
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.server.name.clone(),
            }));
        }
        drop(pending);

        self.tool_cache.lock().await.clear();
        self.instructions.lock().await.take();
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
