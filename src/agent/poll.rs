//! Status polling until a terminal state, and the timeout path that
//! terminates the remote task when the poll budget runs out.

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agent::AgentOptions;
use crate::agent::capability::AgentKind;
use crate::agent::decode;
use crate::agent::events::TaskEvent;
use crate::agent::stream::StreamDeduplicator;
use crate::agent::types::{
    ExecutionResult, StatusSnapshot, TIMEOUT_STATUS, TaskHandle, TaskStatus,
};
use crate::clock::Sleeper;
use crate::transport::ToolTransport;

const TIMEOUT_MESSAGE: &str = "Task timed out before reaching a terminal state";

/// Everything one polling run needs, bundled so the loop and the timeout
/// path share a single signature.
pub(crate) struct PollContext<'a> {
    pub transport: &'a dyn ToolTransport,
    pub sleeper: &'a dyn Sleeper,
    pub kind: AgentKind,
    pub options: &'a AgentOptions,
    pub events: Option<&'a mpsc::Sender<TaskEvent>>,
}

/// Poll task status at a fixed interval until a terminal state or until the
/// attempt budget (`timeout_secs / poll_interval_secs`, floored) runs out.
///
/// A failed status query (transport or decode) returns immediately with
/// `task_status="failed"`: the loop's next iteration would already be the
/// retry, so there is no point retrying in place.
pub(crate) async fn poll_until_terminal(
    ctx: &PollContext<'_>,
    handle: &TaskHandle,
    timeout_secs: u64,
) -> ExecutionResult {
    let interval_secs = ctx.options.poll_interval_secs;
    if interval_secs == 0 {
        return ExecutionResult::failed(
            &handle.request_id,
            &handle.task_id,
            "failed",
            "poll interval must be positive",
        );
    }
    let max_attempts = timeout_secs / interval_secs;
    let interval = std::time::Duration::from_secs(interval_secs);
    let status_tool = ctx.kind.status_tool();
    let args = json!({ "task_id": handle.task_id });

    let mut dedup = StreamDeduplicator::new();
    let mut last_snapshot: Option<StatusSnapshot> = None;
    let mut request_id = handle.request_id.clone();

    for _ in 0..max_attempts {
        let result = match ctx.transport.call_tool(&status_tool, args.clone()).await {
            Ok(result) => result,
            Err(e) => {
                return ExecutionResult::failed(
                    &request_id,
                    &handle.task_id,
                    "failed",
                    format!("status query failed: {e}"),
                );
            }
        };
        request_id = result.request_id.clone();

        if !result.success {
            return ExecutionResult::failed(
                &request_id,
                &handle.task_id,
                "failed",
                message_or(&result.error_message, "status query failed"),
            );
        }

        let snapshot = match decode::decode_status(&result.data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return ExecutionResult::failed(
                    &request_id,
                    &handle.task_id,
                    "failed",
                    format!("invalid status payload: {e}"),
                );
            }
        };

        dedup.ingest(&snapshot.stream, ctx.events).await;

        match TaskStatus::classify(&snapshot.status) {
            TaskStatus::Finished => {
                return ExecutionResult::finished(
                    &request_id,
                    &handle.task_id,
                    &snapshot.status,
                    &snapshot.product,
                );
            }
            TaskStatus::Failed => {
                return ExecutionResult::failed(
                    &request_id,
                    &handle.task_id,
                    &snapshot.status,
                    message_or(&snapshot.error, "task failed"),
                );
            }
            TaskStatus::Cancelled => {
                return ExecutionResult::failed(
                    &request_id,
                    &handle.task_id,
                    &snapshot.status,
                    message_or(&snapshot.error, "task was cancelled"),
                );
            }
            TaskStatus::Unsupported => {
                return ExecutionResult::failed(
                    &request_id,
                    &handle.task_id,
                    &snapshot.status,
                    message_or(&snapshot.error, "task is not supported by this agent"),
                );
            }
            TaskStatus::Running => {
                last_snapshot = Some(snapshot);
                ctx.sleeper.sleep(interval).await;
            }
        }
    }

    handle_timeout(ctx, handle, request_id, last_snapshot.as_ref(), &dedup).await
}

/// Best-effort cancellation: one terminate call, then a bounded confirmation
/// loop. The caller still gets a timeout result whatever happens here.
async fn handle_timeout(
    ctx: &PollContext<'_>,
    handle: &TaskHandle,
    request_id: String,
    last_snapshot: Option<&StatusSnapshot>,
    dedup: &StreamDeduplicator,
) -> ExecutionResult {
    let terminate_tool = ctx.kind.terminate_tool();
    let args = json!({ "task_id": handle.task_id });

    match ctx.transport.call_tool(&terminate_tool, args).await {
        Ok(result) if result.success => {
            debug!("terminate request accepted for task {}", handle.task_id);
        }
        Ok(result) => {
            warn!(
                "terminate request for task {} rejected: {}",
                handle.task_id,
                message_or(&result.error_message, "unknown error")
            );
        }
        Err(e) => {
            warn!("terminate request for task {} failed: {e}", handle.task_id);
        }
    }

    confirm_termination(ctx, handle).await;

    let mut task_result = String::from(TIMEOUT_MESSAGE);
    if !dedup.buffered().is_empty() {
        task_result.push_str(&format!("\nPartial output: {}", dedup.buffered()));
    }
    if let Some(snapshot) = last_snapshot {
        if !snapshot.action.is_empty() {
            task_result.push_str(&format!("\nLast action: {}", snapshot.action));
        }
        if !snapshot.product.is_empty() {
            task_result.push_str(&format!("\nLast result: {}", snapshot.product));
        }
        if !snapshot.error.is_empty() {
            task_result.push_str(&format!("\nLast error: {}", snapshot.error));
        }
        task_result.push_str(&format!("\nLast status: {}", snapshot.status));
    }

    ExecutionResult {
        success: false,
        request_id,
        task_id: handle.task_id.clone(),
        task_status: TIMEOUT_STATUS.to_string(),
        task_result,
        error_message: TIMEOUT_MESSAGE.to_string(),
    }
}

/// Second, smaller polling loop after a terminate request. Its success
/// criterion inverts the primary poller's: only a "not found / already
/// finished" error from the status query counts as confirmed termination;
/// every other response, including another terminal snapshot, is ignored.
async fn confirm_termination(ctx: &PollContext<'_>, handle: &TaskHandle) {
    let status_tool = ctx.kind.status_tool();
    let args = json!({ "task_id": handle.task_id });
    let interval = std::time::Duration::from_secs(ctx.options.cancel_poll_interval_secs);

    for _ in 0..ctx.options.cancel_poll_attempts {
        match ctx.transport.call_tool(&status_tool, args.clone()).await {
            Ok(result) if !result.success && is_task_gone(&result.error_message) => {
                debug!("task {} confirmed terminated", handle.task_id);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("status query during cancellation failed: {e}");
            }
        }
        ctx.sleeper.sleep(interval).await;
    }

    warn!(
        "timed out waiting for task {} cancellation to be confirmed",
        handle.task_id
    );
}

/// The backend's signal that a task no longer exists. The exact wording is
/// not under this client's control; the match lives here so it can be
/// adjusted in one place.
fn is_task_gone(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("not found") || lower.contains("already finished")
}

fn message_or(message: &str, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
