//! Decoding of task-submission and status-query payloads.
//!
//! Missing optional fields default; malformed JSON is a hard failure for the
//! single call it came from. The poll loop's next tick is the retry, so a
//! decode failure is never retried in place.

use serde::Deserialize;

use crate::agent::types::StatusSnapshot;
use crate::error::Result;

/// Payload of a successful task submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubmitPayload {
    #[serde(alias = "taskId")]
    pub task_id: String,
}

pub(crate) fn decode_submit(data: &str) -> Result<SubmitPayload> {
    Ok(serde_json::from_str(data)?)
}

pub(crate) fn decode_status(data: &str) -> Result<StatusSnapshot> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_submit_snake_case() {
        let payload = decode_submit(r#"{"task_id": "t-1"}"#).unwrap();
        assert_eq!(payload.task_id, "t-1");
    }

    #[test]
    fn test_decode_submit_camel_case_alias() {
        let payload = decode_submit(r#"{"taskId": "t-2"}"#).unwrap();
        assert_eq!(payload.task_id, "t-2");
    }

    #[test]
    fn test_decode_submit_missing_id_defaults_empty() {
        let payload = decode_submit(r#"{"status": "running"}"#).unwrap();
        assert!(payload.task_id.is_empty());
    }

    #[test]
    fn test_decode_status_full() {
        let data = r#"{
            "task_id": "t-1",
            "status": "running",
            "action": "opening browser",
            "product": "",
            "stream": [
                {"content": "step 1", "reasoning": "need the page", "timestamp_ms": 100}
            ],
            "error": ""
        }"#;
        let snapshot = decode_status(data).unwrap();
        assert_eq!(snapshot.task_id, "t-1");
        assert_eq!(snapshot.status, "running");
        assert_eq!(snapshot.action, "opening browser");
        assert_eq!(snapshot.stream.len(), 1);
        assert_eq!(snapshot.stream[0].content, "step 1");
        assert_eq!(snapshot.stream[0].timestamp_ms, Some(100));
    }

    #[test]
    fn test_decode_status_missing_fields_default() {
        let snapshot = decode_status(r#"{"status": "finished"}"#).unwrap();
        assert_eq!(snapshot.status, "finished");
        assert!(snapshot.action.is_empty());
        assert!(snapshot.product.is_empty());
        assert!(snapshot.stream.is_empty());
        assert!(snapshot.error.is_empty());
    }

    #[test]
    fn test_decode_status_result_alias() {
        let snapshot = decode_status(r#"{"status": "finished", "result": "42"}"#).unwrap();
        assert_eq!(snapshot.product, "42");
    }

    #[test]
    fn test_decode_status_fragment_timestamp_aliases() {
        let snapshot =
            decode_status(r#"{"stream": [{"content": "a", "timestampMs": 7}]}"#).unwrap();
        assert_eq!(snapshot.stream[0].timestamp_ms, Some(7));
    }

    #[test]
    fn test_decode_status_fragment_without_timestamp() {
        let snapshot = decode_status(r#"{"stream": [{"content": "a"}]}"#).unwrap();
        assert_eq!(snapshot.stream[0].timestamp_ms, None);
    }

    #[test]
    fn test_decode_malformed_is_error() {
        assert!(decode_status("not json").is_err());
        assert!(decode_status("").is_err());
        assert!(decode_submit("{truncated").is_err());
    }
}
