//! Shared error-kind taxonomy.
//!
//! Every crate in the workspace defines its own `thiserror` error enum, but each variant
//! maps onto one of these kinds so the orchestrator and the HTTP layer can treat errors
//! uniformly regardless of which stage produced them.

use serde::{Deserialize, Serialize};

/// The error kinds named by the spec's error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    Busy,
    FetchError,
    TranscribeError,
    RenderError,
    ParseError,
    IoError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Busy => "busy",
            ErrorKind::FetchError => "fetch_error",
            ErrorKind::TranscribeError => "transcribe_error",
            ErrorKind::RenderError => "render_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::IoError => "io_error",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether this kind aborts the job (stage error) rather than returning synchronously
    /// from an orchestrator command.
    pub fn is_stage_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::FetchError
                | ErrorKind::TranscribeError
                | ErrorKind::RenderError
                | ErrorKind::IoError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ErrorKind::Busy.as_str(), "busy");
        assert_eq!(ErrorKind::FetchError.as_str(), "fetch_error");
    }

    #[test]
    fn test_stage_error_classification() {
        assert!(ErrorKind::RenderError.is_stage_error());
        assert!(!ErrorKind::Unauthorized.is_stage_error());
        assert!(!ErrorKind::Busy.is_stage_error());
    }
}
