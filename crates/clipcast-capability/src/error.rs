//! Errors for the external HTTP capability clients.

use clipcast_models::ErrorKind;
use thiserror::Error;

pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability service unavailable: {0}")]
    NotAvailable(String),

    #[error("capability request blocked: {0}")]
    Blocked(String),

    #[error("transcription failed: {0}")]
    TranscribeFailed(String),

    #[error("face detection failed: {0}")]
    DetectionFailed(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CapabilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapabilityError::TranscribeFailed(_) => ErrorKind::TranscribeError,
            CapabilityError::Parse(_) => ErrorKind::ParseError,
            CapabilityError::NotAvailable(_) | CapabilityError::Blocked(_) => ErrorKind::FetchError,
            _ => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CapabilityError::Network(_) | CapabilityError::Timeout(_))
    }
}
