//! Shared data models for the clipcast clip-production core.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, ownership, and lifecycle state (job.rs)
//! - Subtitle documents, styles, and events (subtitle.rs)
//! - Phrase segments, speaker profiles, and cut schedules
//! - The durable clip registry mirror (clip_record.rs)
//! - Progress event envelopes published over pub/sub and WebSocket (ws.rs)
//! - The shared error-kind taxonomy (error.rs)

pub mod caption_edit;
pub mod clip_record;
pub mod cut_schedule;
pub mod error;
pub mod job;
pub mod job_status;
pub mod phrase;
pub mod speaker;
pub mod subtitle;
pub mod timestamp;
pub mod utils;
pub mod ws;

pub use caption_edit::CaptionEdit;
pub use clip_record::{ClipRecord, ANONYMOUS_CLIP_TTL_HOURS};
pub use cut_schedule::{CutSchedule, CutScheduleEntry, CUT_SCHEDULE_NOMINAL_SECS};
pub use error::ErrorKind;
pub use job::{Identity, Job, JobArtifacts, JobId, JobRequest, JobState, RegenStatus};
pub use job_status::{JobStatus, JobStatusCache};
pub use phrase::{contains_emphasis, PhraseSegment, EMPHASIS_LEXICON};
pub use speaker::{CropZone, FaceBox, SpeakerProfile};
pub use subtitle::{
    strip_inline_overrides, Event, FormattingOverlay, Style, SubtitleDocument, SubtitleError,
    SubtitleFormat, D_MIN, G_MIN_MINIMAL_FIX, G_MIN_REDISTRIBUTE,
};
pub use utils::{extract_youtube_id, is_youtube_domain, YoutubeIdError, YoutubeIdResult};
pub use ws::{EventKind, ProgressEvent};
