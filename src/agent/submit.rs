//! Task submission with bounded retry.
//!
//! Retries cover transport-level failures only, and only until a task id has
//! been obtained; resubmitting after that would spawn duplicate remote
//! tasks. A well-formed response without a task id is a backend-side
//! semantic rejection and is not retried either.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::agent::AgentOptions;
use crate::agent::capability::{AgentKind, TaskOptions, submit_args};
use crate::agent::decode;
use crate::agent::events::TaskEvent;
use crate::agent::types::TaskHandle;
use crate::clock::Sleeper;
use crate::transport::ToolTransport;

/// Why a submission ultimately failed, with the request id of the attempt
/// that produced the failure (empty when the RPC itself never completed).
#[derive(Debug)]
pub(crate) struct SubmitFailure {
    pub request_id: String,
    pub message: String,
}

pub(crate) async fn submit_task(
    transport: &dyn ToolTransport,
    sleeper: &dyn Sleeper,
    kind: AgentKind,
    task: &str,
    options: &TaskOptions,
    runner: &AgentOptions,
    events: Option<&mpsc::Sender<TaskEvent>>,
) -> Result<TaskHandle, SubmitFailure> {
    let tool = kind.execute_tool();
    let args = submit_args(kind, task, options);
    let max_attempts = runner.submit_attempts.max(1);
    let backoff = Duration::from_secs(runner.submit_backoff_secs);

    let mut last_failure = SubmitFailure {
        request_id: String::new(),
        message: "task submission failed".to_string(),
    };

    for attempt in 1..=max_attempts {
        match transport.call_tool(&tool, args.clone()).await {
            Ok(result) if result.success => {
                return match decode::decode_submit(&result.data) {
                    Ok(payload) if !payload.task_id.is_empty() => Ok(TaskHandle {
                        task_id: payload.task_id,
                        request_id: result.request_id,
                    }),
                    Ok(_) => Err(SubmitFailure {
                        request_id: result.request_id,
                        message: "task submission returned no task id".to_string(),
                    }),
                    Err(e) => Err(SubmitFailure {
                        request_id: result.request_id,
                        message: format!("invalid task submission payload: {e}"),
                    }),
                };
            }
            Ok(result) => {
                last_failure = SubmitFailure {
                    request_id: result.request_id,
                    message: if result.error_message.is_empty() {
                        "task submission failed".to_string()
                    } else {
                        result.error_message
                    },
                };
            }
            Err(e) => {
                last_failure = SubmitFailure {
                    request_id: String::new(),
                    message: e.to_string(),
                };
            }
        }

        if attempt < max_attempts {
            warn!(
                "{}, retrying in {}s (attempt {}/{})",
                last_failure.message,
                backoff.as_secs(),
                attempt,
                max_attempts
            );
            if let Some(tx) = events {
                let _ = tx
                    .send(TaskEvent::Retry(
                        last_failure.message.clone(),
                        backoff.as_secs(),
                    ))
                    .await;
            }
            sleeper.sleep(backoff).await;
        }
    }

    Err(last_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::NoDelay;
    use crate::transport::mock::MockTransport;

    fn runner_options() -> AgentOptions {
        AgentOptions::default()
    }

    #[tokio::test]
    async fn test_submit_success_first_attempt() {
        let transport = MockTransport::new();
        transport.push_payload(r#"{"task_id": "t-1"}"#);
        let sleeper = NoDelay::default();

        let handle = submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "check the weather",
            &TaskOptions::new(),
            &runner_options(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(handle.task_id, "t-1");
        assert_eq!(transport.calls_named("computer_use_execute_task"), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_retries_transport_failures_then_succeeds() {
        let transport = MockTransport::new();
        transport.push_transport_error("connection refused");
        transport.push_failure("backend busy");
        transport.push_payload(r#"{"taskId": "t-3"}"#);
        let sleeper = NoDelay::default();

        let handle = submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "task",
            &TaskOptions::new(),
            &runner_options(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(handle.task_id, "t-3");
        // Default budget is 3: two failures, one success, no 4th call.
        assert_eq!(transport.calls_named("computer_use_execute_task"), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(1)]
        );
    }

    #[tokio::test]
    async fn test_submit_exhausts_budget_and_returns_last_error() {
        let transport = MockTransport::new();
        transport.push_transport_error("down");
        transport.push_transport_error("down");
        transport.push_failure("still down");
        let sleeper = NoDelay::default();

        let failure = submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "task",
            &TaskOptions::new(),
            &runner_options(),
            None,
        )
        .await
        .unwrap_err();

        assert!(failure.message.contains("still down"));
        assert_eq!(transport.calls_named("computer_use_execute_task"), 3);
    }

    #[tokio::test]
    async fn test_submit_missing_task_id_not_retried() {
        let transport = MockTransport::new();
        transport.push_payload(r#"{"status": "accepted"}"#);
        let sleeper = NoDelay::default();

        let failure = submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "task",
            &TaskOptions::new(),
            &runner_options(),
            None,
        )
        .await
        .unwrap_err();

        assert!(failure.message.contains("no task id"));
        assert_eq!(transport.calls_named("computer_use_execute_task"), 1);
    }

    #[tokio::test]
    async fn test_submit_malformed_payload_not_retried() {
        let transport = MockTransport::new();
        transport.push_payload("not json");
        let sleeper = NoDelay::default();

        let failure = submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "task",
            &TaskOptions::new(),
            &runner_options(),
            None,
        )
        .await
        .unwrap_err();

        assert!(failure.message.contains("invalid task submission payload"));
        assert_eq!(transport.calls_named("computer_use_execute_task"), 1);
    }

    #[tokio::test]
    async fn test_submit_retry_emits_event() {
        let transport = MockTransport::new();
        transport.push_transport_error("connection refused");
        transport.push_payload(r#"{"task_id": "t-9"}"#);
        let sleeper = NoDelay::default();
        let (tx, mut rx) = mpsc::channel(8);

        submit_task(
            &transport,
            &sleeper,
            AgentKind::Computer,
            "task",
            &TaskOptions::new(),
            &runner_options(),
            Some(&tx),
        )
        .await
        .unwrap();

        match rx.try_recv() {
            Ok(TaskEvent::Retry(reason, delay)) => {
                assert!(reason.contains("connection refused"));
                assert_eq!(delay, 1);
            }
            other => panic!("expected retry event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_forwards_kind_specific_args() {
        let transport = MockTransport::new();
        transport.push_payload(r#"{"task_id": "t-b"}"#);
        let sleeper = NoDelay::default();

        submit_task(
            &transport,
            &sleeper,
            AgentKind::Browser,
            "find the weather",
            &TaskOptions::new().with_vision(true),
            &runner_options(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(transport.calls_named("browser_use_execute_task"), 1);
        assert_eq!(transport.args_of_call(0)["use_vision"], true);
    }
}
