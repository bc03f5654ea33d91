//! Transcriber capability client (§4.7, §6).
//!
//! The core treats this as a pure function of `(media_path, offset, duration) → segments`.
//! Failure is `transcribe_error` and aborts the job with status `failed`.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CapabilityError, CapabilityResult};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_ATTEMPTS: u32 = 3;

/// One word with its own timing, present only in word mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A transcript segment as returned by the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub words: Option<Vec<WordTiming>>,
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    media_path: &'a str,
    offset: f64,
    duration: f64,
    want_words: bool,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    segments: Vec<TranscriptSegment>,
}

/// HTTP client for the external transcription service.
pub struct TranscriberClient {
    base_url: String,
    client: Client,
}

impl TranscriberClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        let base_url = std::env::var("TRANSCRIBER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9101".to_string());
        Ok(Self::new(base_url))
    }

    /// Request segments for a window of `media_path`, optionally with per-word timing.
    pub async fn segments(
        &self,
        media_path: impl AsRef<Path>,
        offset: f64,
        duration: f64,
        want_words: bool,
    ) -> CapabilityResult<Vec<TranscriptSegment>> {
        let media_path = media_path.as_ref().to_string_lossy().to_string();
        let request = TranscribeRequest {
            media_path: &media_path,
            offset,
            duration,
            want_words,
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.call(&request).await {
                Ok(segments) => return Ok(segments),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    warn!(attempt, "transcriber call failed, retrying: {}", e);
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(250 * (attempt as u64 + 1))).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CapabilityError::TranscribeFailed("exhausted retries".into())))
    }

    async fn call(&self, request: &TranscribeRequest<'_>) -> CapabilityResult<Vec<TranscriptSegment>> {
        let url = format!("{}/v1/transcribe", self.base_url);
        debug!(url = %url, "calling transcriber");

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CapabilityError::TranscribeFailed(format!(
                "transcriber returned {}",
                response.status()
            )));
        }

        let body: TranscribeResponse = response.json().await?;
        Ok(body.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn segments_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "segments": [{"text": "hello there", "start": 0.0, "end": 1.2, "words": null}]
            })))
            .mount(&server)
            .await;

        let client = TranscriberClient::new(server.uri());
        let segments = client.segments("video.mp4", 0.0, 30.0, false).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "hello there");
    }

    #[tokio::test]
    async fn segments_surfaces_transcribe_failed_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transcribe"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = TranscriberClient::new(server.uri());
        let err = client.segments("video.mp4", 0.0, 30.0, false).await.unwrap_err();
        assert!(matches!(err, CapabilityError::TranscribeFailed(_)));
    }
}
