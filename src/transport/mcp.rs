//! MCP stdio transport: spawns the sandbox's tool server as a child process
//! and issues `tools/call` requests over it.

use mcp_sdk_rs::client::Client;
use mcp_sdk_rs::session::Session;
use mcp_sdk_rs::transport::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};

use super::{CallToolResult, ToolTransport, TransportError};

use async_trait::async_trait;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: Option<HashMap<String, String>>,
}

pub struct McpTransport {
    client: Client,
    _to_session_tx: mpsc::UnboundedSender<Message>,
}

impl McpTransport {
    /// Spawn the tool server and complete the MCP initialize handshake.
    pub async fn spawn(config: McpServerConfig) -> Result<Self, TransportError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        if let Some(env) = config.env {
            cmd.envs(env);
        }

        let (to_session_tx, to_session_rx) = mpsc::unbounded_channel::<Message>();
        let (from_session_tx, from_session_rx) = mpsc::unbounded_channel::<Message>();

        let session = Session::Local {
            handler: None,
            command: cmd,
            receiver: Arc::new(Mutex::new(to_session_rx)),
            sender: Arc::new(from_session_tx),
        };

        session
            .start()
            .await
            .map_err(|e| TransportError::SpawnFailed(e.to_string()))?;

        let client = Client::new(to_session_tx.clone(), from_session_rx);

        client
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {
                        "name": "agentbox",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        client
            .notify("notifications/initialized", None)
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        Ok(Self {
            client,
            _to_session_tx: to_session_tx,
        })
    }
}

#[async_trait]
impl ToolTransport for McpTransport {
    async fn call_tool(&self, name: &str, args: Value) -> Result<CallToolResult, TransportError> {
        // The MCP layer carries no correlation id for us; stamp one
        // client-side so results stay traceable across the SDK boundary.
        let request_id = uuid::Uuid::new_v4().to_string();

        let response = self
            .client
            .request(
                "tools/call",
                Some(json!({
                    "name": name,
                    "arguments": args
                })),
            )
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let is_error = response
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        // MCP content is an array of objects like { type: "text", text: "..." };
        // the backend puts its JSON payload in the text parts.
        let content = &response["content"];
        let text = if let Some(arr) = content.as_array() {
            arr.iter()
                .filter_map(|item| item.get("text").and_then(|v| v.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            content.to_string()
        };

        if is_error {
            Ok(CallToolResult {
                success: false,
                data: String::new(),
                error_message: text,
                request_id,
            })
        } else {
            Ok(CallToolResult {
                success: true,
                data: text,
                error_message: String::new(),
                request_id,
            })
        }
    }
}
