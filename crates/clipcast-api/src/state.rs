//! Application state.

use std::sync::Arc;

use clipcast_capability::{FaceDetectorClient, TranscriberClient};
use clipcast_queue::ProgressChannel;
use clipcast_registry::{ClipRegistry, FirestoreClient};
use clipcast_worker::WorkerConfig;

use crate::auth::{JwtVerifier, SessionSigner};
use crate::config::ApiConfig;
use crate::orchestrator::Orchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<ClipRegistry>,
    pub progress: Arc<ProgressChannel>,
    pub jwt: Arc<JwtVerifier>,
    pub session_signer: Arc<SessionSigner>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let registry = Arc::new(ClipRegistry::new(firestore));

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let progress = Arc::new(ProgressChannel::new(&redis_url)?);

        let worker_config = WorkerConfig::from_env();
        let transcriber = TranscriberClient::from_env()?;
        let face_detector = FaceDetectorClient::from_env()?;

        let orchestrator = Orchestrator::new(
            worker_config,
            Arc::clone(&progress),
            Arc::clone(&registry),
            transcriber,
            face_detector,
        );

        let jwt = Arc::new(JwtVerifier::from_env());
        let session_signer = Arc::new(SessionSigner::from_env());

        Ok(Self {
            config,
            orchestrator,
            registry,
            progress,
            jwt,
            session_signer,
        })
    }
}
