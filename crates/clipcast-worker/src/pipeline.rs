//! Pipeline stage functions (§4.11 data flow): acquire → plan → render master → transcribe →
//! assemble → burn, plus the caption regeneration stage. Each function is a pure-ish async
//! function of its inputs and the filesystem; the orchestrator sequences them inside a
//! per-job `tokio::spawn` task and publishes progress between stages.

use std::path::{Path, PathBuf};

use clipcast_capability::{FaceDetectorClient, TranscriberClient};
use clipcast_media::{AcquiredSource, CropPlan, PeakWindow, VideoInfo};
use clipcast_models::{CropZone, Event, PhraseSegment, SubtitleDocument};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::phrase_assembler::assemble_phrases;

/// Stage 1: fetch the source video, or reuse it from the shared URL cache (§4.4).
pub async fn acquire(config: &WorkerConfig, url: &str) -> WorkerResult<AcquiredSource> {
    Ok(clipcast_media::acquire(url, config.downloads_dir()).await?)
}

/// Probe the acquired source's duration and dimensions.
pub async fn probe(source_path: impl AsRef<Path>) -> WorkerResult<VideoInfo> {
    Ok(clipcast_media::probe_video(source_path).await?)
}

/// Stage 2: choose the clip window. Bypassed (confidence fixed) when the caller pins a start.
pub fn select_window(video: &VideoInfo, target_duration: f64, pinned_start: Option<f64>) -> PeakWindow {
    clipcast_media::select_peak(video.duration, target_duration, pinned_start)
}

/// Stage 3: sample frames, detect faces, cluster speakers and (if ≥2) build a cut schedule.
pub async fn plan_speakers(
    source_path: impl AsRef<Path>,
    start_offset: f64,
    target_duration: f64,
    frame_width: f64,
    frame_height: f64,
    face_detector: &FaceDetectorClient,
) -> WorkerResult<CropPlan> {
    Ok(clipcast_media::plan_crop(
        source_path,
        start_offset,
        target_duration,
        frame_width,
        frame_height,
        face_detector,
    )
    .await?)
}

/// Stage 4: render the caption-free master M0 and snapshot it to its pristine sidecar path.
/// Returns the pristine sidecar path, which all later burns (initial + every regeneration)
/// read from rather than the working master.
pub async fn render_caption_free_master(
    source_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    start_offset: f64,
    target_duration: f64,
    crop_plan: &CropPlan,
) -> WorkerResult<PathBuf> {
    let sole_crop_zone = crop_plan
        .speakers
        .first()
        .map(|s| s.crop_zone)
        .unwrap_or(CropZone { x: 0.0, y: 0.0, w: 1.0, h: 1.0 });

    let speakers = crop_plan.speakers.clone();
    let per_speaker_crop_zone = move |speaker_id: u8| {
        speakers
            .iter()
            .find(|s| s.id == speaker_id)
            .map(|s| s.crop_zone)
            .unwrap_or(sole_crop_zone)
    };

    clipcast_media::render_master(
        source_path,
        output_path.as_ref(),
        start_offset,
        target_duration,
        sole_crop_zone,
        crop_plan.cut_schedule.as_ref(),
        per_speaker_crop_zone,
    )
    .await?;

    Ok(clipcast_media::snapshot_pristine_master(output_path).await?)
}

/// Stage 5: transcribe the clip window and assemble phrase-level captions into a styled
/// subtitle document D0.
pub async fn transcribe_and_assemble(
    transcriber: &TranscriberClient,
    media_path: impl AsRef<Path>,
    offset: f64,
    duration: f64,
) -> WorkerResult<(Vec<PhraseSegment>, SubtitleDocument)> {
    let segments = transcriber.segments(media_path, offset, duration, true).await?;
    let phrases = assemble_phrases(&segments);

    let events: Vec<Event> = phrases
        .iter()
        .enumerate()
        .map(|(i, p)| Event {
            index: i,
            speaker_label: p.speaker_label.clone(),
            start: p.start,
            end: p.end,
            text: p.text.clone(),
            formatting_overlay: None,
        })
        .collect();

    let document = clipcast_media::style_materialization(events);
    Ok((phrases, document))
}

/// Stage 6: burn D0 onto the pristine master to produce the final artifact F0.
pub async fn burn_initial_captions(
    pristine_master_path: impl AsRef<Path>,
    document: &SubtitleDocument,
    final_path: impl AsRef<Path>,
) -> WorkerResult<()> {
    let subtitle_file = tempfile::NamedTempFile::new().map_err(crate::error::WorkerError::Io)?;
    let written =
        clipcast_media::write_subtitle_document(document, clipcast_models::SubtitleFormat::Styled);
    tokio::fs::write(subtitle_file.path(), written).await?;

    clipcast_media::burn_captions(pristine_master_path, subtitle_file.path(), final_path).await?;
    Ok(())
}

/// Caption regeneration stage (§4.10), invoked by the `update-captions` command.
pub async fn regenerate(
    edited: Vec<clipcast_media::regen::EditedCaption>,
    original: Option<&SubtitleDocument>,
    clip_duration: f64,
    pristine_master_path: impl AsRef<Path>,
    final_path: impl AsRef<Path>,
) -> WorkerResult<SubtitleDocument> {
    Ok(clipcast_media::regenerate_captions(
        edited,
        original,
        clip_duration,
        pristine_master_path,
        final_path,
    )
    .await?)
}
