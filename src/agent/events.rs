/// Events emitted on the optional side channel while a task runs.
///
/// Distinct from the final `ExecutionResult`: these arrive incrementally, in
/// real time, as the poll loop observes progress.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Newly observed stream fragment. Emitted exactly once per fragment
    /// even when the backend resends cumulative snapshots.
    Output {
        content: String,
        reasoning: String,
        timestamp_ms: Option<i64>,
    },
    /// Submission retry in progress: (reason, `delay_seconds`)
    Retry(String, u64),
}
