#![deny(unreachable_patterns)]
//! Media pipeline primitives: source acquisition, subtitle I/O, caption fragmentation,
//! peak selection, crop planning, FFmpeg rendering, and caption regeneration.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress parsing and cancellation
//! - A source acquirer with a local cache (§4.4)
//! - Subtitle document parsing/writing for both styled and simple variants (§4.2)
//! - A caption fragment normalizer (§4.3)
//! - Peak-window selection over a probed source (§4.5)
//! - Speaker/crop planning backed by the face-detection capability (§4.6)
//! - Render primitives: extract, concat, burn (§4.9)
//! - The caption regeneration engine (§4.10)

pub mod command;
pub mod crop_planner;
pub mod download;
pub mod error;
pub mod fragment;
pub mod fs_utils;
pub mod peak_selector;
pub mod probe;
pub mod progress;
pub mod regen;
pub mod render;
pub mod subtitle_io;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use crop_planner::{plan_crop, CropPlan};
pub use download::{acquire, is_supported_url, AcquiredSource};
pub use error::{MediaError, MediaResult};
pub use fragment::normalize_fragments;
pub use peak_selector::{select_peak, PeakWindow};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use regen::{regenerate_captions, style_materialization};
pub use render::{
    burn_captions, concat_segments, extract_segment, no_captions_sidecar_path, render_master,
    snapshot_pristine_master,
};
pub use subtitle_io::{read_subtitle_document, write_subtitle_document};
