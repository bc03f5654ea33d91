//! Session-to-user promotion (§4.11, §4.12): once a caller signs in, every job they made
//! anonymously is rewritten to the new user id, both in the orchestrator's in-memory map and
//! in the durable clip registry.

use std::sync::Arc;

use crate::error::ApiResult;
use crate::orchestrator::Orchestrator;

pub struct PromotionService {
    orchestrator: Arc<Orchestrator>,
}

impl PromotionService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn promote(&self, session_id: &str, user_id: &str) -> ApiResult<()> {
        self.orchestrator.promote_session(session_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcast_capability::{FaceDetectorClient, TranscriberClient};
    use clipcast_queue::ProgressChannel;
    use clipcast_registry::{ClipRegistry, FirestoreClient, FirestoreConfig};
    use clipcast_worker::WorkerConfig;

    async fn test_orchestrator() -> Arc<Orchestrator> {
        let firestore = FirestoreClient::new(FirestoreConfig {
            project_id: "test-project".to_string(),
            base_url: "http://localhost:1".to_string(),
        })
        .await
        .expect("firestore client construction does not touch the network");
        let registry = Arc::new(ClipRegistry::new(firestore));
        let progress = Arc::new(ProgressChannel::new("redis://localhost:6379").unwrap());
        let transcriber = TranscriberClient::new("http://localhost:9101");
        let face_detector = FaceDetectorClient::new("http://localhost:9102");
        Orchestrator::new(WorkerConfig::default(), progress, registry, transcriber, face_detector)
    }

    #[tokio::test]
    async fn test_promote_with_no_jobs_is_a_no_op() {
        let orchestrator = test_orchestrator().await;
        let service = PromotionService::new(orchestrator);
        assert!(service.promote("session-1", "user-1").await.is_ok());
    }
}
