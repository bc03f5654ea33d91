//! Firestore integration tests. Require live GCP credentials; opt in with `cargo test -- --ignored`.

use clipcast_models::{ClipRecord, Identity};
use clipcast_registry::{ClipRegistry, FirestoreClient};

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_firestore_connection() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env()
        .await
        .expect("failed to create Firestore client");

    let result = client.get_document("_health", "_check").await;
    match result {
        Ok(_) => println!("health check document reachable"),
        Err(e) => panic!("unexpected error reaching Firestore: {e}"),
    }
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_clip_registry_save_load_promote_round_trip() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env()
        .await
        .expect("failed to create Firestore client");
    let registry = ClipRegistry::new(client);

    let job_id = format!("integration-test-{}", uuid::Uuid::new_v4());
    let owner = Identity::session("integration-test-session");
    let record = ClipRecord::new(job_id.clone(), owner, "https://www.youtube.com/watch?v=test");

    registry.save(&record).await.expect("failed to save clip record");

    let fetched = registry.load(&job_id).await.expect("failed to load clip record");
    assert_eq!(fetched.job_id, job_id);

    registry
        .promote(&job_id, "integration-test-user")
        .await
        .expect("failed to promote clip record");

    let promoted = registry.load(&job_id).await.expect("failed to load promoted record");
    assert!(matches!(promoted.owner, Identity::User { .. }));
}
