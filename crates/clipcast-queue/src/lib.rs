//! Progress pub/sub and status-cache plumbing for the job orchestrator (§4.11, §6).
//!
//! The core is explicitly single-process (§1 Non-goals): job dispatch is in-process
//! `tokio::spawn`, not a distributed queue. This crate keeps only the half of the teacher's
//! queue package that matches the orchestrator's fan-out contract — Redis pub/sub plus
//! sorted-set history and heartbeat tracking.

pub mod error;
pub mod progress;

pub use error::{QueueError, QueueResult};
pub use progress::{
    ProgressChannel, StoredEvent, HEARTBEAT_TTL_SECS, JOB_STATUS_TTL_SECS, PROGRESS_HISTORY_TTL_SECS,
    STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS,
};
