//! Worker error types.

use clipcast_models::ErrorKind;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("media error: {0}")]
    Media(#[from] clipcast_media::MediaError),

    #[error("capability error: {0}")]
    Capability(#[from] clipcast_capability::CapabilityError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Map onto the shared error-kind taxonomy (§7) so the orchestrator can translate a stage
    /// failure into the right job-failure message without matching on crate-specific variants.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Media(e) => e.kind(),
            WorkerError::Capability(e) => e.kind(),
            WorkerError::Io(_) => ErrorKind::IoError,
            WorkerError::ConfigError(_) => ErrorKind::Internal,
            WorkerError::JobFailed(_) | WorkerError::ProcessingFailed(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable by the orchestrator's per-stage retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::FetchError | ErrorKind::TranscribeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_failed_maps_to_internal() {
        let err = WorkerError::job_failed("boom");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_retryable());
    }
}
