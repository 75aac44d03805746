use serde::{Deserialize, Serialize};

/// Status label synthesized client-side when the poll budget is exhausted.
/// The backend never returns this value.
pub const TIMEOUT_STATUS: &str = "timeout";

/// Classification of a backend task status string.
///
/// Matching is case-sensitive; the backend's exact strings are preserved
/// verbatim in results, this enum only drives dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is still making progress. Any unrecognized status string also
    /// classifies here, so unknown states keep the poll loop alive.
    Running,
    /// Successful termination (`"finished"` or `"completed"`).
    Finished,
    Failed,
    Cancelled,
    /// The backend deliberately refused the task. Distinct from a generic
    /// failure so callers can tell the two apart.
    Unsupported,
}

impl TaskStatus {
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        match raw {
            "finished" | "completed" => Self::Finished,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "unsupported" => Self::Unsupported,
            _ => Self::Running,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One streamed piece of task output/reasoning.
///
/// `timestamp_ms` is the de-duplication key: fragments are identical across
/// snapshots iff their timestamp matches exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFragment {
    pub content: String,
    pub reasoning: String,
    #[serde(alias = "timestampMs", alias = "timestamp")]
    pub timestamp_ms: Option<i64>,
}

/// Decoded result of one status query.
///
/// `stream` may be a cumulative snapshot overlapping with previously seen
/// fragments, not a delta.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    #[serde(alias = "taskId")]
    pub task_id: String,
    pub status: String,
    pub action: String,
    #[serde(alias = "result")]
    pub product: String,
    pub stream: Vec<StreamFragment>,
    pub error: String,
}

/// Opaque identifier for a submitted task, plus the request id of the call
/// that produced it. Immutable once assigned; the backend may discard the id
/// after a terminal state is observed or cancellation is confirmed.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub task_id: String,
    pub request_id: String,
}

/// Caller-facing outcome of a task execution. Always returned, never thrown;
/// failure is represented in-band.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub request_id: String,
    pub task_id: String,
    /// Backend status string verbatim, or the synthesized `"timeout"`.
    pub task_status: String,
    pub task_result: String,
    pub error_message: String,
}

impl ExecutionResult {
    pub(crate) fn finished(
        request_id: impl Into<String>,
        task_id: impl Into<String>,
        status: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            request_id: request_id.into(),
            task_id: task_id.into(),
            task_status: status.into(),
            task_result: product.into(),
            error_message: String::new(),
        }
    }

    pub(crate) fn failed(
        request_id: impl Into<String>,
        task_id: impl Into<String>,
        status: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            request_id: request_id.into(),
            task_id: task_id.into(),
            task_status: status.into(),
            task_result: String::new(),
            error_message: error.into(),
        }
    }
}

/// Caller-facing outcome of a bare status query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub request_id: String,
    /// Raw JSON status payload on success.
    pub output: String,
    pub error_message: String,
}
