//! Worker stage configuration: per-call timeouts and the filesystem workspace root.

use std::time::Duration;

/// Configuration shared by every pipeline stage function (§4.11, §5).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Workspace root; stage functions derive `downloads/`, `clips/` under it (§6).
    pub work_dir: String,
    /// Timeout for the source fetch stage.
    pub fetch_timeout: Duration,
    /// Timeout for a single transcription call.
    pub transcribe_timeout: Duration,
    /// Timeout for a single ffmpeg invocation (extract/concat/burn).
    pub render_timeout: Duration,
    /// Overall per-job timeout enforced by the orchestrator.
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/clipcast".to_string(),
            fetch_timeout: Duration::from_secs(600),
            transcribe_timeout: Duration::from_secs(120),
            render_timeout: Duration::from_secs(300),
            job_timeout: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/clipcast".to_string()),
            fetch_timeout: Duration::from_secs(
                std::env::var("WORKER_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            transcribe_timeout: Duration::from_secs(
                std::env::var("WORKER_TRANSCRIBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            render_timeout: Duration::from_secs(
                std::env::var("WORKER_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }

    pub fn downloads_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("downloads")
    }

    pub fn clips_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("clips")
    }
}
