//! Progress event envelope published to the pub/sub channel and forwarded over WebSocket
//! (§4.11, §6).

use crate::job::JobState;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The kind of progress event (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Complete,
    Error,
    RegenUpdate,
    RegenComplete,
    RegenError,
}

/// One progress event, keyed by job id, published to the `job_id` pub/sub room (§4.11).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: String,
    pub kind: EventKind,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
}

impl ProgressEvent {
    pub fn progress(job_id: impl Into<String>, state: JobState, progress: u8, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::Progress,
            progress: progress.min(100),
            message: message.into(),
            state: Some(state),
        }
    }

    pub fn complete(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::Complete,
            progress: 100,
            message: "completed".to_string(),
            state: Some(JobState::Completed),
        }
    }

    pub fn error(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::Error,
            progress: 0,
            message: message.into(),
            state: Some(JobState::Failed),
        }
    }

    pub fn regen_update(job_id: impl Into<String>, progress: u8, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::RegenUpdate,
            progress: progress.min(100),
            message: message.into(),
            state: None,
        }
    }

    pub fn regen_complete(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::RegenComplete,
            progress: 100,
            message: "regeneration complete".to_string(),
            state: None,
        }
    }

    pub fn regen_error(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: EventKind::RegenError,
            progress: 0,
            message: message.into(),
            state: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_clamps_progress() {
        let event = ProgressEvent::progress("job-1", JobState::Rendering, 150, "almost done");
        assert_eq!(event.progress, 100);
    }

    #[test]
    fn test_complete_event_shape() {
        let event = ProgressEvent::complete("job-1");
        assert_eq!(event.kind, EventKind::Complete);
        assert_eq!(event.state, Some(JobState::Completed));
    }

    #[test]
    fn test_regen_events_carry_no_state() {
        let event = ProgressEvent::regen_update("job-1", 40, "reconciling timings");
        assert!(event.state.is_none());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("\"state\""));
    }
}
