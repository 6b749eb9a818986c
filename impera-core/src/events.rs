//! Event types broadcast by the pipeline to observing hosts.
//!
//! Hosts subscribe via [`crate::CommandPipeline::subscribe_status`] and
//! typically log or surface these; they serialize with camelCase fields and
//! lowercase state names so a UI layer can consume them as-is.

use serde::{Deserialize, Serialize};

/// Recording state of the dispatch pipeline. Exactly one value at any time,
/// owned exclusively by the pipeline; it changes only through the pipeline's
/// own event handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No capture in progress; ready for a start request.
    Idle,
    /// Capture running; audio is being recorded.
    Recording,
    /// Capture stopped; waiting for the transcription's terminal outcome.
    Processing,
}

/// Emitted on every state change, including failure recoveries back to Idle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatusEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub state: RecordingState,
    /// Optional human-readable detail (e.g. why a cycle failed).
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serializes_with_lowercase_state() {
        let event = PipelineStatusEvent {
            seq: 4,
            state: RecordingState::Processing,
            detail: Some("awaiting transcription".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["seq"], 4);
        assert_eq!(json["state"], "processing");
        assert_eq!(json["detail"], "awaiting transcription");

        let round_trip: PipelineStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.state, RecordingState::Processing);
        assert_eq!(round_trip.detail.as_deref(), Some("awaiting transcription"));
    }

    #[test]
    fn recording_state_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<RecordingState>(r#""Recording""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }
}
