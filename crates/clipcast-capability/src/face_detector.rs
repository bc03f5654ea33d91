//! Face detector capability client (§4.6, §6), sharing the transcriber's retry/timeout plumbing.

use std::path::Path;
use std::time::Duration;

use clipcast_models::FaceBox;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CapabilityError, CapabilityResult};

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    faces: Vec<FaceBox>,
}

/// HTTP client for the external face-detection service.
pub struct FaceDetectorClient {
    base_url: String,
    client: Client,
}

impl FaceDetectorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        let base_url = std::env::var("FACE_DETECTOR_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9102".to_string());
        Ok(Self::new(base_url))
    }

    /// Detect faces in a still frame at `image_path`.
    pub async fn detect_faces(&self, image_path: impl AsRef<Path>) -> CapabilityResult<Vec<FaceBox>> {
        let image_path = image_path.as_ref().to_string_lossy().to_string();
        let request = DetectRequest { image_path: &image_path };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.call(&request).await {
                Ok(faces) => return Ok(faces),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    warn!(attempt, "face detector call failed, retrying: {}", e);
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(200 * (attempt as u64 + 1))).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CapabilityError::DetectionFailed("exhausted retries".into())))
    }

    async fn call(&self, request: &DetectRequest<'_>) -> CapabilityResult<Vec<FaceBox>> {
        let url = format!("{}/v1/detect", self.base_url);
        debug!(url = %url, "calling face detector");

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CapabilityError::DetectionFailed(format!(
                "face detector returned {}",
                response.status()
            )));
        }

        let body: DetectResponse = response.json().await?;
        Ok(body.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn detect_faces_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "faces": [{"x": 100.0, "y": 50.0, "w": 80.0, "h": 80.0}]
            })))
            .mount(&server)
            .await;

        let client = FaceDetectorClient::new(server.uri());
        let faces = client.detect_faces("frame.png").await.unwrap();
        assert_eq!(faces.len(), 1);
    }

    #[tokio::test]
    async fn detect_faces_returns_empty_list_when_none_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"faces": []})))
            .mount(&server)
            .await;

        let client = FaceDetectorClient::new(server.uri());
        let faces = client.detect_faces("frame.png").await.unwrap();
        assert!(faces.is_empty());
    }
}
