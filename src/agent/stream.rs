//! Exactly-once surfacing of streamed task output.

use std::collections::HashSet;
use tokio::sync::mpsc;

use crate::agent::events::TaskEvent;
use crate::agent::types::StreamFragment;

/// Tracks which fragments have been emitted across the lifetime of one
/// blocking execution.
///
/// The backend may return a cumulative snapshot of all fragments on every
/// poll rather than true deltas; the seen-timestamp set filters the overlap.
/// Emitted content is also buffered so the timeout path can hand back
/// whatever partial output the task produced.
#[derive(Default)]
pub(crate) struct StreamDeduplicator {
    seen: HashSet<i64>,
    buffer: String,
}

impl StreamDeduplicator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Emit fragments not seen before on the event channel (best-effort) and
    /// record them. Returns how many fragments were new.
    pub(crate) async fn ingest(
        &mut self,
        fragments: &[StreamFragment],
        events: Option<&mpsc::Sender<TaskEvent>>,
    ) -> usize {
        let mut emitted = 0;
        for fragment in fragments {
            if let Some(ts) = fragment.timestamp_ms {
                if !self.seen.insert(ts) {
                    continue;
                }
            }
            // No timestamp: never deduplicated, always treated as new.

            self.buffer.push_str(&fragment.content);
            if let Some(tx) = events {
                let _ = tx
                    .send(TaskEvent::Output {
                        content: fragment.content.clone(),
                        reasoning: fragment.reasoning.clone(),
                        timestamp_ms: fragment.timestamp_ms,
                    })
                    .await;
            }
            emitted += 1;
        }
        emitted
    }

    /// All content emitted so far.
    pub(crate) fn buffered(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(content: &str, ts: Option<i64>) -> StreamFragment {
        StreamFragment {
            content: content.to_string(),
            reasoning: String::new(),
            timestamp_ms: ts,
        }
    }

    #[tokio::test]
    async fn test_repeated_snapshot_not_double_emitted() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut dedup = StreamDeduplicator::new();

        let snapshot = vec![fragment("a", Some(1)), fragment("b", Some(2))];
        assert_eq!(dedup.ingest(&snapshot, Some(&tx)).await, 2);
        assert_eq!(dedup.ingest(&snapshot, Some(&tx)).await, 0);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TaskEvent::Output { content, .. } = event {
                received.push(content);
            }
        }
        assert_eq!(received, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_superset_emits_only_new_fragment() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut dedup = StreamDeduplicator::new();

        dedup
            .ingest(&[fragment("a", Some(1)), fragment("b", Some(2))], Some(&tx))
            .await;
        let superset = vec![
            fragment("a", Some(1)),
            fragment("b", Some(2)),
            fragment("c", Some(3)),
        ];
        assert_eq!(dedup.ingest(&superset, Some(&tx)).await, 1);

        let mut received = Vec::new();
        while let Ok(TaskEvent::Output { content, .. }) = rx.try_recv() {
            received.push(content);
        }
        assert_eq!(received, vec!["a", "b", "c"]);
        assert_eq!(dedup.buffered(), "abc");
    }

    #[tokio::test]
    async fn test_fragment_without_timestamp_always_new() {
        let mut dedup = StreamDeduplicator::new();
        let snapshot = vec![fragment("x", None)];
        assert_eq!(dedup.ingest(&snapshot, None).await, 1);
        assert_eq!(dedup.ingest(&snapshot, None).await, 1);
        assert_eq!(dedup.buffered(), "xx");
    }

    #[tokio::test]
    async fn test_ingest_without_channel_still_buffers() {
        let mut dedup = StreamDeduplicator::new();
        dedup.ingest(&[fragment("partial", Some(5))], None).await;
        assert_eq!(dedup.buffered(), "partial");
    }
}
