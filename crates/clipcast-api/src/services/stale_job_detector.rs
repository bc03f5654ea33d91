//! Background service for detecting and recovering stale jobs.
//!
//! This service runs periodically to:
//! - Detect jobs that have stopped responding (no heartbeat)
//! - Mark them as failed in both Redis and the in-memory orchestrator
//! - Notify any connected clients via the progress channel

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use clipcast_models::JobId;
use clipcast_queue::{ProgressChannel, STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS};

use crate::orchestrator::Orchestrator;

/// Interval between stale job detection runs.
const DETECTION_INTERVAL: Duration = Duration::from_secs(30);

/// Stale job detector service.
pub struct StaleJobDetector {
    progress: Arc<ProgressChannel>,
    orchestrator: Arc<Orchestrator>,
    enabled: bool,
}

impl StaleJobDetector {
    /// Create a new stale job detector.
    pub fn new(progress: Arc<ProgressChannel>, orchestrator: Arc<Orchestrator>) -> Self {
        let enabled = std::env::var("ENABLE_STALE_DETECTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self {
            progress,
            orchestrator,
            enabled,
        }
    }

    /// Start the background detection loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Stale job detection is disabled");
            return;
        }

        info!("Starting stale job detector (interval: {:?})", DETECTION_INTERVAL);

        let mut ticker = interval(DETECTION_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = self.detect_and_recover().await {
                error!("Stale job detection error: {}", e);
            }
        }
    }

    /// Run a single detection and recovery cycle.
    async fn detect_and_recover(&self) -> anyhow::Result<()> {
        let active_jobs = self.progress.get_active_jobs().await?;

        if active_jobs.is_empty() {
            return Ok(());
        }

        let mut stale_count = 0u32;
        let mut recovered_count = 0u32;

        for job_status in active_jobs {
            if job_status.is_terminal() {
                continue;
            }

            let is_stale = job_status.is_stale(STALE_THRESHOLD_SECS, STALE_GRACE_PERIOD_SECS);

            if is_stale {
                stale_count += 1;

                warn!(
                    job_id = %job_status.job_id,
                    owner = %job_status.user_id,
                    last_heartbeat = ?job_status.last_heartbeat,
                    started_at = %job_status.started_at,
                    "Detected stale job (no heartbeat)"
                );

                if let Err(e) = self.recover_stale_job(&job_status.job_id).await {
                    error!(job_id = %job_status.job_id, "Failed to recover stale job: {}", e);
                } else {
                    recovered_count += 1;
                    info!(job_id = %job_status.job_id, "Successfully recovered stale job");
                }
            }
        }

        if stale_count > 0 {
            info!(
                "Stale job detection complete: {} stale, {} recovered",
                stale_count, recovered_count
            );
        }

        let cleaned = self.progress.cleanup_active_jobs().await?;
        if cleaned > 0 {
            info!("Cleaned up {} orphaned active job entries", cleaned);
        }

        Ok(())
    }

    /// Recover a stale job by marking it as failed in the status cache, the orchestrator's
    /// in-memory state, and the progress stream any connected client is watching.
    async fn recover_stale_job(&self, job_id_str: &str) -> anyhow::Result<()> {
        let job_id = JobId::from_string(job_id_str.to_string());
        let error_message = "Processing timed out. The worker may have crashed. Please try again.";

        self.progress.fail_job_status(&job_id, error_message).await?;
        self.orchestrator.fail_job(&job_id, error_message).await;

        Ok(())
    }

    /// Run a single check (for testing or manual invocation).
    pub async fn check_once(&self) -> anyhow::Result<(u32, u32)> {
        let active_jobs = self.progress.get_active_jobs().await?;
        let mut stale_count = 0u32;
        let mut recovered_count = 0u32;

        for job_status in active_jobs {
            if job_status.is_terminal() {
                continue;
            }

            let is_stale = job_status.is_stale(STALE_THRESHOLD_SECS, STALE_GRACE_PERIOD_SECS);

            if is_stale {
                stale_count += 1;
                if self.recover_stale_job(&job_status.job_id).await.is_ok() {
                    recovered_count += 1;
                }
            }
        }

        Ok((stale_count, recovered_count))
    }
}
