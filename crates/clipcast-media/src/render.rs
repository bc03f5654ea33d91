//! Render pipeline (§4.9): three primitive operations — extract, concat, burn — composed by
//! the job orchestrator's render stage.

use std::path::{Path, PathBuf};

use clipcast_models::{CropZone, CutSchedule};
use tempfile::TempDir;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Target output dimensions for a rendered clip (9:16).
const OUTPUT_WIDTH: u32 = 1080;
const OUTPUT_HEIGHT: u32 = 1920;
const OUTPUT_BITRATE: &str = "6M";

/// Extract a cropped, re-encoded fragment from `source` starting at `offset` for `duration`
/// seconds, using `crop_zone` (in source-frame coordinates).
pub async fn extract_segment(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    offset: f64,
    duration: f64,
    crop_zone: CropZone,
) -> MediaResult<()> {
    let crop_filter = format!(
        "crop={}:{}:{}:{},scale={}:{}",
        crop_zone.w as i64, crop_zone.h as i64, crop_zone.x as i64, crop_zone.y as i64,
        OUTPUT_WIDTH, OUTPUT_HEIGHT,
    );

    let cmd = FfmpegCommand::new(source.as_ref(), output.as_ref())
        .seek(offset)
        .duration(duration)
        .video_filter(crop_filter)
        .video_codec("libx264")
        .preset("veryfast")
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_arg("-b:v")
        .output_arg(OUTPUT_BITRATE);

    FfmpegRunner::new().run(&cmd).await?;
    Ok(())
}

/// Extract one fragment per cut-schedule entry, then concat them (speaker-switching path), or
/// a single extract (single-speaker path) when `cut_schedule` is absent.
pub async fn render_master(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_offset: f64,
    target_duration: f64,
    sole_crop_zone: CropZone,
    cut_schedule: Option<&CutSchedule>,
    per_speaker_crop_zone: impl Fn(u8) -> CropZone,
) -> MediaResult<()> {
    let source = source.as_ref();
    let output = output.as_ref();

    match cut_schedule {
        Some(schedule) if schedule.entries.len() > 1 => {
            let temp_dir = TempDir::new().map_err(crate::error::MediaError::Io)?;
            let mut fragment_paths = Vec::with_capacity(schedule.entries.len());

            for (i, entry) in schedule.entries.iter().enumerate() {
                let fragment_path = temp_dir.path().join(format!("fragment_{i:04}.mp4"));
                extract_segment(
                    source,
                    &fragment_path,
                    start_offset + entry.source_offset,
                    entry.duration,
                    per_speaker_crop_zone(entry.speaker_id),
                )
                .await?;
                fragment_paths.push(fragment_path);
            }

            concat_segments(&fragment_paths, output).await?;
            info!(count = fragment_paths.len(), "rendered speaker-switching master");
        }
        _ => {
            extract_segment(source, output, start_offset, target_duration, sole_crop_zone).await?;
            info!("rendered single-speaker master");
        }
    }

    Ok(())
}

/// Stream-copy concatenation of ordered fragments into a single media file.
pub async fn concat_segments(fragments: &[PathBuf], output: impl AsRef<Path>) -> MediaResult<()> {
    let temp_dir = TempDir::new().map_err(crate::error::MediaError::Io)?;
    let list_path = temp_dir.path().join("concat_list.txt");

    let list_body = fragments
        .iter()
        .map(|p| format!("file '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    tokio::fs::write(&list_path, list_body).await?;

    let cmd = FfmpegCommand::new(&list_path, output.as_ref())
        .input_arg("-f")
        .input_arg("concat")
        .input_arg("-safe")
        .input_arg("0")
        .output_arg("-c")
        .output_arg("copy");

    FfmpegRunner::new().run(&cmd).await?;
    Ok(())
}

/// Rasterize subtitles from `subtitle_path` onto `media_path`, producing `output`.
pub async fn burn_captions(
    media_path: impl AsRef<Path>,
    subtitle_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let subtitle_filter = format!("subtitles={}", escape_filter_path(subtitle_path.as_ref()));

    let cmd = FfmpegCommand::new(media_path.as_ref(), output.as_ref())
        .video_filter(subtitle_filter)
        .video_codec("libx264")
        .preset("veryfast")
        .audio_codec("copy");

    FfmpegRunner::new().run(&cmd).await?;
    Ok(())
}

/// Copy the caption-free master `m0` to its sidecar path before any burn step, so later
/// regenerations can burn a fresh subtitle document onto the pristine master (§4.9 invariant).
pub async fn snapshot_pristine_master(m0: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let m0 = m0.as_ref();
    let sidecar = no_captions_sidecar_path(m0);
    tokio::fs::copy(m0, &sidecar).await?;
    Ok(sidecar)
}

/// The `*_no_captions.*` sidecar path for a master at `path`.
pub fn no_captions_sidecar_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
    let file_name = if ext.is_empty() {
        format!("{stem}_no_captions")
    } else {
        format!("{stem}_no_captions.{ext}")
    };
    path.with_file_name(file_name)
}

/// FFmpeg's `subtitles` filter treats `:` and `'` specially; escape them for the filtergraph.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\").replace(':', "\\:").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_captions_sidecar_path() {
        let sidecar = no_captions_sidecar_path(Path::new("/clips/job123.mp4"));
        assert_eq!(sidecar, Path::new("/clips/job123_no_captions.mp4"));
    }

    #[test]
    fn test_escape_filter_path_handles_colon() {
        let escaped = escape_filter_path(Path::new("C:/clips/subs.ass"));
        assert!(escaped.contains("\\:"));
    }
}
