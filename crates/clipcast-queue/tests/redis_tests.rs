//! Redis/progress-channel integration tests. Require a live Redis instance; opt in with
//! `cargo test -- --ignored`.

use std::time::Duration;

use futures_util::StreamExt;

use clipcast_models::{JobId, JobState, ProgressEvent};
use clipcast_queue::ProgressChannel;

fn test_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_status_lifecycle() {
    dotenvy::dotenv().ok();

    let progress = ProgressChannel::new(&test_redis_url()).expect("failed to create progress channel");
    let job_id = JobId::new();

    progress
        .init_job_status(&job_id, "test-owner")
        .await
        .expect("failed to init job status");

    let status = progress
        .get_job_status(&job_id)
        .await
        .expect("failed to get job status")
        .expect("status should exist after init");
    assert_eq!(status.user_id, "test-owner");

    progress.update_job_progress(&job_id, 50).await.expect("failed to update progress");
    progress.complete_job_status(&job_id).await.expect("failed to complete job status");

    let completed = progress
        .get_job_status(&job_id)
        .await
        .expect("failed to get job status")
        .expect("status should still exist after completion");
    assert!(completed.is_terminal());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_progress_channel_pub_sub() {
    dotenvy::dotenv().ok();

    let progress = ProgressChannel::new(&test_redis_url()).expect("failed to create progress channel");
    let job_id = JobId::new();

    let progress_clone = progress.clone();
    let job_id_clone = job_id.clone();
    let subscriber = tokio::spawn(async move {
        let mut stream = progress_clone
            .subscribe(&job_id_clone)
            .await
            .expect("failed to subscribe");
        let mut received = Vec::new();

        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = stream.next().await {
                received.push(event);
                if received.len() >= 2 {
                    break;
                }
            }
        })
        .await;

        received
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    progress
        .publish(&job_id, &ProgressEvent::progress(job_id.to_string(), JobState::Downloading, 10, "fetching"))
        .await
        .ok();
    progress
        .publish(&job_id, &ProgressEvent::complete(job_id.to_string()))
        .await
        .ok();

    let received = subscriber.await.expect("subscriber task panicked");
    assert_eq!(received.len(), 2);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_history_is_replayable_after_publish() {
    dotenvy::dotenv().ok();

    let progress = ProgressChannel::new(&test_redis_url()).expect("failed to create progress channel");
    let job_id = JobId::new();

    progress
        .publish_with_history(&job_id, &ProgressEvent::progress(job_id.to_string(), JobState::Rendering, 40, "rendering"))
        .await
        .expect("failed to publish with history");

    let history = progress.get_full_history(&job_id).await.expect("failed to get history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event.progress, 40);

    progress.clear_history(&job_id).await.ok();
}
