//! Tool-call transport boundary.
//!
//! Every backend interaction flows through one RPC primitive: execute a
//! named tool with JSON arguments, get back a JSON payload as a string plus
//! a success flag. Connection-level retry/backoff belongs to the transport
//! implementation, not to the orchestrator above it.

mod mcp;

pub use mcp::{McpServerConfig, McpTransport};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Envelope every tool call comes back in.
#[derive(Debug, Clone, Default)]
pub struct CallToolResult {
    pub success: bool,
    /// JSON payload as a string. Empty when the call produced no body.
    pub data: String,
    pub error_message: String,
    /// Propagated into every caller-facing result for traceability,
    /// including failure paths.
    pub request_id: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to spawn server: {0}")]
    SpawnFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Disconnected")]
    Disconnected,
}

/// The single RPC primitive through which all backend interaction flows.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Execute one remote tool call.
    async fn call_tool(&self, name: &str, args: Value) -> Result<CallToolResult, TransportError>;
}
