#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod agent;
pub mod clock;
pub mod error;
pub mod transport;

pub use agent::{
    Agent, AgentKind, AgentOptions, ExecutionResult, QueryResult, StatusSnapshot, StreamFragment,
    TaskEvent, TaskHandle, TaskOptions, TaskStatus,
};
pub use clock::{Sleeper, TokioSleeper};
pub use error::{Error, Result};
pub use transport::{CallToolResult, McpServerConfig, McpTransport, ToolTransport, TransportError};
