//! Agent kinds and their per-kind request deltas.
//!
//! The submit/poll/terminate state machine is implemented once; the only
//! variation between computer, browser, and mobile agents is the tool-name
//! prefix and a few additive submit fields, captured here as data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which remote environment the agent drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Computer,
    Browser,
    Mobile,
}

impl AgentKind {
    /// Tool-name prefix for this kind. Tool names are `(prefix)_(action)`.
    #[must_use]
    pub fn tool_prefix(self) -> &'static str {
        match self {
            Self::Computer => "computer_use",
            Self::Browser => "browser_use",
            Self::Mobile => "mobile_use",
        }
    }

    #[must_use]
    pub fn execute_tool(self) -> String {
        format!("{}_execute_task", self.tool_prefix())
    }

    #[must_use]
    pub fn status_tool(self) -> String {
        format!("{}_get_task_status", self.tool_prefix())
    }

    #[must_use]
    pub fn terminate_tool(self) -> String {
        format!("{}_terminate_task", self.tool_prefix())
    }
}

/// Per-task request options. Each field applies only to the agent kinds that
/// understand it; the others ignore it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    /// Browser: let the agent work from screenshots in addition to the DOM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_vision: Option<bool>,
    /// Browser: JSON schema describing the structured output to produce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Mobile: upper bound on UI steps the agent may take.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
}

impl TaskOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vision(mut self, use_vision: bool) -> Self {
        self.use_vision = Some(use_vision);
        self
    }

    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Build the submit arguments for one task: the task text plus whatever
/// kind-specific fields the options carry.
pub(crate) fn submit_args(kind: AgentKind, task: &str, options: &TaskOptions) -> Value {
    let mut args = serde_json::Map::new();
    args.insert("task".to_string(), Value::String(task.to_string()));

    match kind {
        AgentKind::Computer => {}
        AgentKind::Browser => {
            if let Some(use_vision) = options.use_vision {
                args.insert("use_vision".to_string(), Value::Bool(use_vision));
            }
            if let Some(ref schema) = options.output_schema {
                args.insert("output_schema".to_string(), schema.clone());
            }
        }
        AgentKind::Mobile => {
            if let Some(max_steps) = options.max_steps {
                args.insert("max_steps".to_string(), Value::from(max_steps));
            }
        }
    }

    Value::Object(args)
}
