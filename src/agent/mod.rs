//! Task runner: submits natural-language tasks to a remote sandboxed agent
//! and drives them to completion over the tool-call transport.

pub mod capability;
mod decode;
pub mod events;
mod poll;
mod stream;
mod submit;
pub mod types;

pub use capability::{AgentKind, TaskOptions};
pub use events::TaskEvent;
pub use types::{
    ExecutionResult, QueryResult, StatusSnapshot, StreamFragment, TaskHandle, TaskStatus,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::clock::{Sleeper, TokioSleeper};
use crate::transport::ToolTransport;

/// Tunables for the task runner loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Seconds between status queries while a task is running.
    pub poll_interval_secs: u64,
    /// Submission attempts before giving up. Covers transport failures only.
    pub submit_attempts: u32,
    /// Seconds between submission attempts.
    pub submit_backoff_secs: u64,
    /// Seconds between cancellation-confirmation queries after a timeout.
    pub cancel_poll_interval_secs: u64,
    /// Cancellation-confirmation queries before giving up.
    pub cancel_poll_attempts: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            submit_attempts: 3,
            submit_backoff_secs: 1,
            cancel_poll_interval_secs: 1,
            cancel_poll_attempts: 30,
        }
    }
}

/// Drives one remote agent through submit/status/terminate tool calls.
///
/// One logical task per call; independent calls on independent task ids may
/// run concurrently. All public operations return their outcome in-band:
/// nothing here returns `Err` to the caller.
pub struct Agent {
    transport: Arc<dyn ToolTransport>,
    kind: AgentKind,
    options: AgentOptions,
    sleeper: Arc<dyn Sleeper>,
    events: Option<mpsc::Sender<TaskEvent>>,
}

impl Agent {
    #[must_use]
    pub fn new(transport: Arc<dyn ToolTransport>, kind: AgentKind) -> Self {
        Self {
            transport,
            kind,
            options: AgentOptions::default(),
            sleeper: Arc::new(TokioSleeper),
            events: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a side channel for incremental task output and retry notices.
    #[must_use]
    pub fn with_event_sender(mut self, events: mpsc::Sender<TaskEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the sleeper used between polling rounds (tests, simulation).
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Submit a task and return immediately with its running task id.
    ///
    /// Intended for callers polling on their own schedule via
    /// [`Agent::get_task_status`] / [`Agent::terminate_task`].
    pub async fn execute_task(&self, task: &str, options: &TaskOptions) -> ExecutionResult {
        match submit::submit_task(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            self.kind,
            task,
            options,
            &self.options,
            self.events.as_ref(),
        )
        .await
        {
            Ok(handle) => ExecutionResult {
                success: true,
                request_id: handle.request_id,
                task_id: handle.task_id,
                task_status: "running".to_string(),
                task_result: String::new(),
                error_message: String::new(),
            },
            Err(failure) => {
                ExecutionResult::failed(failure.request_id, "", "failed", failure.message)
            }
        }
    }

    /// Submit a task and block until it reaches a terminal state or the
    /// timeout expires. On timeout the remote task is terminated
    /// (best-effort) before the result is returned.
    pub async fn execute_task_and_wait(
        &self,
        task: &str,
        timeout_secs: u64,
        options: &TaskOptions,
    ) -> ExecutionResult {
        let handle = match submit::submit_task(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            self.kind,
            task,
            options,
            &self.options,
            self.events.as_ref(),
        )
        .await
        {
            Ok(handle) => handle,
            Err(failure) => {
                return ExecutionResult::failed(failure.request_id, "", "failed", failure.message);
            }
        };

        let ctx = poll::PollContext {
            transport: self.transport.as_ref(),
            sleeper: self.sleeper.as_ref(),
            kind: self.kind,
            options: &self.options,
            events: self.events.as_ref(),
        };
        poll::poll_until_terminal(&ctx, &handle, timeout_secs).await
    }

    /// Query the current status of a task; the raw JSON payload lands in
    /// `output`.
    pub async fn get_task_status(&self, task_id: &str) -> QueryResult {
        let args = json!({ "task_id": task_id });
        match self.transport.call_tool(&self.kind.status_tool(), args).await {
            Ok(result) if result.success => QueryResult {
                success: true,
                request_id: result.request_id,
                output: result.data,
                error_message: String::new(),
            },
            Ok(result) => QueryResult {
                success: false,
                request_id: result.request_id,
                output: String::new(),
                error_message: if result.error_message.is_empty() {
                    "status query failed".to_string()
                } else {
                    result.error_message
                },
            },
            Err(e) => QueryResult {
                success: false,
                request_id: String::new(),
                output: String::new(),
                error_message: e.to_string(),
            },
        }
    }

    /// Request termination of a running task. Advisory: the backend may have
    /// already finished or discarded the task.
    pub async fn terminate_task(&self, task_id: &str) -> ExecutionResult {
        let args = json!({ "task_id": task_id });
        match self
            .transport
            .call_tool(&self.kind.terminate_tool(), args)
            .await
        {
            Ok(result) if result.success => match decode::decode_status(&result.data) {
                Ok(snapshot) => ExecutionResult {
                    success: true,
                    request_id: result.request_id,
                    task_id: if snapshot.task_id.is_empty() {
                        task_id.to_string()
                    } else {
                        snapshot.task_id
                    },
                    task_status: snapshot.status,
                    task_result: String::new(),
                    error_message: String::new(),
                },
                Err(e) => ExecutionResult::failed(
                    result.request_id,
                    task_id,
                    "failed",
                    format!("invalid terminate payload: {e}"),
                ),
            },
            Ok(result) => ExecutionResult::failed(
                result.request_id,
                task_id,
                "failed",
                if result.error_message.is_empty() {
                    "terminate request failed".to_string()
                } else {
                    result.error_message
                },
            ),
            Err(e) => ExecutionResult::failed(String::new(), task_id, "failed", e.to_string()),
        }
    }
}
