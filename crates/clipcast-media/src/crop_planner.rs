//! Speaker/crop planner (§4.6): samples frames from the preview window, clusters detected
//! faces into at most two speakers, and derives 9:16 crop zones and (for multi-speaker clips)
//! a cut schedule.

use std::path::{Path, PathBuf};

use clipcast_capability::FaceDetectorClient;
use clipcast_models::{CropZone, CutSchedule, CutScheduleEntry, FaceBox, SpeakerProfile, CUT_SCHEDULE_NOMINAL_SECS};
use tempfile::TempDir;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Frames sampled across the preview window.
const SAMPLE_FRAME_COUNT: usize = 5;
/// Preview window length, capped at 10s from the chosen start (§4.6).
const PREVIEW_WINDOW_SECS: f64 = 10.0;

/// Output of the speaker/crop planner.
#[derive(Debug, Clone)]
pub struct CropPlan {
    pub speakers: Vec<SpeakerProfile>,
    pub cut_schedule: Option<CutSchedule>,
}

/// Plan crop zones (and, for multi-speaker clips, a cut schedule) for a clip starting at
/// `start_offset` in `source_path` with `target_duration` seconds, at `frame_width`x`frame_height`.
pub async fn plan_crop(
    source_path: impl AsRef<Path>,
    start_offset: f64,
    target_duration: f64,
    frame_width: f64,
    frame_height: f64,
    face_detector: &FaceDetectorClient,
) -> MediaResult<CropPlan> {
    let source_path = source_path.as_ref();
    let (_temp_dir, frames) = sample_frames(source_path, start_offset).await?;

    let mut detections: Vec<FaceBox> = Vec::new();
    for frame in &frames {
        if let Ok(faces) = face_detector.detect_faces(frame).await {
            detections.extend(faces);
        }
    }

    let speakers = cluster_speakers(&detections, frame_width, frame_height);

    let cut_schedule = if speakers.len() >= 2 {
        Some(build_cut_schedule(target_duration, speakers.len() as u8))
    } else {
        None
    };

    Ok(CropPlan { speakers, cut_schedule })
}

async fn sample_frames(source_path: &Path, start_offset: f64) -> MediaResult<(TempDir, Vec<PathBuf>)> {
    let temp_dir = TempDir::new().map_err(crate::error::MediaError::Io)?;
    let mut frames = Vec::with_capacity(SAMPLE_FRAME_COUNT);
    let runner = FfmpegRunner::new();

    for i in 0..SAMPLE_FRAME_COUNT {
        let offset_within_window =
            start_offset + (PREVIEW_WINDOW_SECS * i as f64) / (SAMPLE_FRAME_COUNT.max(1) as f64 - 1.0).max(1.0);
        let frame_path = temp_dir.path().join(format!("frame_{i}.jpg"));
        let cmd = FfmpegCommand::new(source_path, &frame_path)
            .seek(offset_within_window)
            .single_frame();
        runner.run(&cmd).await?;
        frames.push(frame_path);
    }

    Ok((temp_dir, frames))
}

/// Cluster detections by frame x-axis midpoint into at most two groups (left, right). With no
/// detections, synthesize two default speakers at (1/4 W, 1/2 H) and (3/4 W, 1/2 H) (§4.6).
fn cluster_speakers(detections: &[FaceBox], frame_width: f64, frame_height: f64) -> Vec<SpeakerProfile> {
    if detections.is_empty() {
        return vec![
            default_speaker(0, frame_width * 0.25, frame_width, frame_height),
            default_speaker(1, frame_width * 0.75, frame_width, frame_height),
        ];
    }

    let midpoint = frame_width / 2.0;
    let mut left: Vec<&FaceBox> = Vec::new();
    let mut right: Vec<&FaceBox> = Vec::new();

    for face in detections {
        if face.center_x() < midpoint {
            left.push(face);
        } else {
            right.push(face);
        }
    }

    let mut speakers = Vec::new();
    if !left.is_empty() {
        speakers.push(speaker_from_group(0, &left, frame_width, frame_height));
    }
    if !right.is_empty() {
        speakers.push(speaker_from_group(speakers.len() as u8, &right, frame_width, frame_height));
    }

    if speakers.is_empty() {
        return vec![
            default_speaker(0, frame_width * 0.25, frame_width, frame_height),
            default_speaker(1, frame_width * 0.75, frame_width, frame_height),
        ];
    }

    speakers
}

fn speaker_from_group(id: u8, group: &[&FaceBox], frame_width: f64, frame_height: f64) -> SpeakerProfile {
    let center = group.iter().map(|f| f.center_x()).sum::<f64>() / group.len() as f64;
    SpeakerProfile {
        id,
        label: SpeakerProfile::label_for(id),
        color: SpeakerProfile::canonical_color(id).to_string(),
        face_center: center,
        face_box: Some(**group.first().unwrap()),
        crop_zone: crop_zone_for_center(center, frame_width, frame_height),
    }
}

fn default_speaker(id: u8, center: f64, frame_width: f64, frame_height: f64) -> SpeakerProfile {
    SpeakerProfile {
        id,
        label: SpeakerProfile::label_for(id),
        color: SpeakerProfile::canonical_color(id).to_string(),
        face_center: center,
        face_box: None,
        crop_zone: crop_zone_for_center(center, frame_width, frame_height),
    }
}

/// A 9:16 crop window anchored so `center` lies in the lateral third it belongs to.
fn crop_zone_for_center(center: f64, frame_width: f64, frame_height: f64) -> CropZone {
    let crop_width = frame_height * 9.0 / 16.0;
    let crop_width = crop_width.min(frame_width);
    let half = crop_width / 2.0;
    let x = (center - half).clamp(0.0, (frame_width - crop_width).max(0.0));
    CropZone {
        x,
        y: 0.0,
        w: crop_width,
        h: frame_height,
    }
}

/// Partition `target_duration` into nominal-`L`-second segments, alternating speakers (§4.6).
fn build_cut_schedule(target_duration: f64, speaker_count: u8) -> CutSchedule {
    let l = CUT_SCHEDULE_NOMINAL_SECS;
    let n = (target_duration / l).floor() as u64;
    let remainder = target_duration - n as f64 * l;

    let mut durations: Vec<f64> = if n == 0 {
        vec![target_duration]
    } else if remainder <= 0.5 {
        vec![target_duration / n as f64; n as usize]
    } else {
        let mut d = vec![l; n as usize];
        d.push(remainder);
        d
    };

    if durations.is_empty() {
        durations.push(target_duration);
    }

    let mut entries = Vec::with_capacity(durations.len());
    let mut offset = 0.0;
    for (i, duration) in durations.into_iter().enumerate() {
        let speaker_id = (i as u8) % speaker_count.max(1);
        entries.push(CutScheduleEntry {
            source_offset: offset,
            duration,
            speaker_id,
        });
        offset += duration;
    }

    CutSchedule::new(entries)
}
