//! Job identity, ownership, and lifecycle state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, unguessable job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing string as a job id (e.g. loaded from storage).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller's identity: exactly one of an authenticated user or an anonymous session.
///
/// This also serves as a `Job`'s ownership marker (§3 Data Model).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    User { user_id: String },
    Session { session_id: String },
}

impl Identity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User {
            user_id: user_id.into(),
        }
    }

    pub fn session(session_id: impl Into<String>) -> Self {
        Self::Session {
            session_id: session_id.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Session { .. })
    }

    /// True if `self` is an authorized caller for a job owned by `owner`: identities must
    /// match exactly (§4.11 authorization policy).
    pub fn authorizes(&self, owner: &Identity) -> bool {
        self == owner
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::User { user_id } => write!(f, "user:{user_id}"),
            Identity::Session { session_id } => write!(f, "session:{session_id}"),
        }
    }
}

/// Job processing state (§3, §4.11 stage sequencing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Downloading,
    Planning,
    Rendering,
    Transcribing,
    Burning,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Downloading => "downloading",
            JobState::Planning => "planning",
            JobState::Rendering => "rendering",
            JobState::Transcribing => "transcribing",
            JobState::Burning => "burning",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// The next state in the create-job stage sequencing, if `self` is non-terminal.
    pub fn next(&self) -> Option<JobState> {
        match self {
            JobState::Pending => Some(JobState::Downloading),
            JobState::Downloading => Some(JobState::Planning),
            JobState::Planning => Some(JobState::Rendering),
            JobState::Rendering => Some(JobState::Transcribing),
            JobState::Transcribing => Some(JobState::Burning),
            JobState::Burning => Some(JobState::Completed),
            JobState::Completed | JobState::Failed => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Regeneration substate, carried only by `completed` jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegenStatus {
    #[default]
    Idle,
    Regenerating,
    RegenFailed,
}

impl RegenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegenStatus::Idle => "idle",
            RegenStatus::Regenerating => "regenerating",
            RegenStatus::RegenFailed => "regen_failed",
        }
    }
}

/// The caller's clip-production request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub source_url: String,
    pub duration_secs: f64,
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
}

/// On-disk artifact paths produced as the job progresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobArtifacts {
    pub final_path: Option<String>,
    pub master_path: Option<String>,
    pub subtitle_path: Option<String>,
    pub subtitle_format: Option<String>,
}

/// One end-to-end clip-production request and its state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: Identity,
    pub request: JobRequest,
    pub state: JobState,
    pub regen_status: RegenStatus,
    pub progress: u8,
    pub message: String,
    pub artifacts: JobArtifacts,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
    pub fn new(owner: Identity, request: JobRequest) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: JobId::new(),
            owner,
            request,
            state: JobState::Pending,
            regen_status: RegenStatus::Idle,
            progress: 0,
            message: "queued".to_string(),
            artifacts: JobArtifacts::default(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to a new state, resetting progress for the new stage.
    pub fn transition(&mut self, state: JobState, message: impl Into<String>) {
        self.state = state;
        self.message = message.into();
        self.updated_at = chrono::Utc::now();
    }

    /// Update progress within the current stage. Monotonic within a stage by convention of
    /// the caller; regeneration cycles are allowed to decrease it (§3).
    pub fn set_progress(&mut self, progress: u8, message: impl Into<String>) {
        self.progress = progress.min(100);
        self.message = message.into();
        self.updated_at = chrono::Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.updated_at = chrono::Utc::now();
    }

    pub fn complete(&mut self) {
        self.state = JobState::Completed;
        self.progress = 100;
        self.message = "completed".to_string();
        self.updated_at = chrono::Utc::now();
    }

    /// Rewrite ownership from a session id to a user id (§4.11 promotion). No-op if this job
    /// is not owned by `session_id`. Idempotent.
    pub fn promote(&mut self, session_id: &str, user_id: &str) {
        if let Identity::Session { session_id: owned } = &self.owner {
            if owned == session_id {
                self.owner = Identity::user(user_id);
                self.updated_at = chrono::Utc::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> JobRequest {
        JobRequest {
            source_url: "https://youtu.be/x".into(),
            duration_secs: 20.0,
            start_offset: None,
            end_offset: None,
        }
    }

    #[test]
    fn test_job_id_round_trip() {
        let id = JobId::new();
        let s = id.to_string();
        let restored = JobId::from_string(s.clone());
        assert_eq!(restored.as_str(), s);
    }

    #[test]
    fn test_identity_authorization() {
        let a = Identity::session("sess-1");
        let b = Identity::session("sess-1");
        let c = Identity::session("sess-2");
        assert!(a.authorizes(&b));
        assert!(!a.authorizes(&c));
    }

    #[test]
    fn test_stage_sequencing() {
        assert_eq!(JobState::Pending.next(), Some(JobState::Downloading));
        assert_eq!(JobState::Burning.next(), Some(JobState::Completed));
        assert_eq!(JobState::Completed.next(), None);
        assert_eq!(JobState::Failed.next(), None);
    }

    #[test]
    fn test_job_promotion_is_idempotent() {
        let mut job = Job::new(Identity::session("s1"), sample_request());
        job.promote("s1", "u1");
        assert_eq!(job.owner, Identity::user("u1"));
        // Second promote with the old session id is a no-op now that owner changed.
        job.promote("s1", "u2");
        assert_eq!(job.owner, Identity::user("u1"));
    }

    #[test]
    fn test_job_fail_sets_terminal_state() {
        let mut job = Job::new(Identity::user("u1"), sample_request());
        job.fail("fetch_error: blocked");
        assert!(job.state.is_terminal());
        assert_eq!(job.error_message.as_deref(), Some("fetch_error: blocked"));
    }
}
