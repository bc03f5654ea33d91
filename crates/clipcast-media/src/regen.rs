//! Caption regeneration engine (§4.10): rebuilds a styled subtitle document from a
//! user-edited caption list, optionally anchored to the original transcript's timings, then
//! burns it onto the pristine master and atomically swaps the result in for the final clip.

use std::path::Path;

use clipcast_models::{
    contains_emphasis, Event, FormattingOverlay, SpeakerProfile, Style, SubtitleDocument,
    D_MIN, EMPHASIS_LEXICON, G_MIN_MINIMAL_FIX, G_MIN_REDISTRIBUTE,
};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::MediaResult;
use crate::fragment::normalize_fragments;
use crate::render::burn_captions;

/// A user-edited caption line, prior to timing assignment. `start`/`end` carry whatever
/// timing the caller provided on the wire (§4.10 phase 2); `None` means the caller sent text
/// only and timing reconciliation must derive it.
#[derive(Debug, Clone)]
pub struct EditedCaption {
    pub speaker_label: String,
    pub text: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// Run all five phases and atomically replace `final_path` with the newly rendered clip.
/// On any failure, `final_path` is left untouched and the caller should report `regen_failed`.
pub async fn regenerate_captions(
    edited: Vec<EditedCaption>,
    original: Option<&SubtitleDocument>,
    clip_duration: f64,
    pristine_master_path: impl AsRef<Path>,
    final_path: impl AsRef<Path>,
) -> MediaResult<SubtitleDocument> {
    let normalized = normalize_phase(edited);
    let (events, g_min) = timing_reconciliation(&normalized, original, clip_duration);
    let events = overlap_elimination(events, g_min);
    let document = style_materialization(events);

    document
        .validate(g_min)
        .map_err(|e| crate::error::MediaError::internal(e.to_string()))?;

    let subtitle_file = NamedTempFile::new().map_err(crate::error::MediaError::Io)?;
    let written = crate::subtitle_io::write_subtitle_document(&document, clipcast_models::SubtitleFormat::Styled);
    tokio::fs::write(subtitle_file.path(), written).await?;

    let rendered_temp = NamedTempFile::new().map_err(crate::error::MediaError::Io)?;
    burn_captions(pristine_master_path.as_ref(), subtitle_file.path(), rendered_temp.path()).await?;

    crate::fs_utils::move_file(rendered_temp.path(), final_path.as_ref()).await?;
    info!(events = document.events.len(), "caption regeneration complete");

    Ok(document)
}

/// Phase 1: normalize (§4.3), mapping edited captions into placeholder events carrying
/// whatever timing the caller provided (zeroed where absent) for later phases to assign.
fn normalize_phase(edited: Vec<EditedCaption>) -> Vec<Event> {
    let placeholders: Vec<Event> = edited
        .into_iter()
        .enumerate()
        .map(|(i, c)| Event {
            index: i,
            speaker_label: c.speaker_label,
            start: c.start.unwrap_or(0.0),
            end: c.end.unwrap_or(0.0),
            text: c.text,
            formatting_overlay: None,
        })
        .collect();
    normalize_fragments(placeholders)
}

/// Phase 2: timing reconciliation.
fn timing_reconciliation(
    edited: &[Event],
    original: Option<&SubtitleDocument>,
    clip_duration: f64,
) -> (Vec<Event>, f64) {
    let u_len = edited.len();

    if let Some(d0) = original {
        let d0_len = d0.events.len();

        if u_len == d0_len {
            let events = edited
                .iter()
                .zip(d0.events.iter())
                .enumerate()
                .map(|(i, (u, o))| timed_event(i, u, o.start, o.end))
                .collect();
            return (events, G_MIN_MINIMAL_FIX);
        }

        if u_len < d0_len {
            let events = edited
                .iter()
                .zip(d0.events.iter().take(u_len))
                .enumerate()
                .map(|(i, (u, o))| timed_event(i, u, o.start, o.end))
                .collect();
            return (events, G_MIN_MINIMAL_FIX);
        }

        // u_len > d0_len: distribute across D0's span with equal stride.
        let first_start = d0.events.first().map(|e| e.start).unwrap_or(0.0);
        let last_end = d0.events.last().map(|e| e.end).unwrap_or(clip_duration);
        let span = (last_end - first_start).max(0.001);
        let stride = span / u_len as f64;
        let event_duration = (2.0_f64).min(stride * 0.7);

        let events = edited
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let start = first_start + stride * i as f64;
                timed_event(i, u, start, start + event_duration)
            })
            .collect();
        return (events, G_MIN_REDISTRIBUTE);
    }

    // D0 unavailable: infer compression from the edited set's own provided span. Captions
    // with no provided timing carry start = end = 0.0 from `normalize_phase`, which reads as
    // zero coverage here and correctly forces the redistribute branch below.
    let first_start = edited.first().map(|e| e.start).unwrap_or(0.0);
    let last_end = edited.last().map(|e| e.end).unwrap_or(0.0);
    let coverage = ((last_end - first_start) / clip_duration.max(0.001)).max(0.0);

    if coverage < 0.6 {
        let lo = 0.05 * clip_duration;
        let hi = 0.90 * clip_duration;
        let span = (hi - lo).max(0.001);
        let stride = (span / u_len.max(1) as f64).clamp(0.3, 2.0);
        let events = edited
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let start = lo + stride * i as f64;
                timed_event(i, u, start, start + 1.5)
            })
            .collect();
        (events, G_MIN_REDISTRIBUTE)
    } else {
        // Coverage is adequate: keep the caller's own timings, only flooring short events.
        let events = edited
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let start = u.start;
                let end = if u.end - u.start < 0.3 { start + 0.8 } else { u.end };
                timed_event(i, u, start, end)
            })
            .collect();
        (events, G_MIN_MINIMAL_FIX)
    }
}

fn timed_event(index: usize, source: &Event, start: f64, end: f64) -> Event {
    Event {
        index,
        speaker_label: source.speaker_label.clone(),
        start,
        end,
        text: source.text.clone(),
        formatting_overlay: None,
    }
}

/// Phase 3: overlap elimination.
fn overlap_elimination(mut events: Vec<Event>, g_min: f64) -> Vec<Event> {
    let len = events.len();
    for i in 0..len {
        if let Some(next_start) = events.get(i + 1).map(|e| e.start) {
            if events[i].end > next_start - g_min {
                events[i].end = next_start - g_min;
            }
        }
        if events[i].end - events[i].start < D_MIN {
            warn!(index = i, "event below minimum duration, flooring to D_MIN");
            events[i].end = events[i].start + D_MIN;
        }
    }
    events
}

/// Phase 4: style materialization. Also used directly by the phrase assembler to build the
/// initial D0 document from freshly transcribed phrases, which share the same styling rules.
pub fn style_materialization(events: Vec<Event>) -> SubtitleDocument {
    let mut labels: Vec<String> = Vec::new();
    for event in &events {
        if !labels.contains(&event.speaker_label) {
            labels.push(event.speaker_label.clone());
        }
    }

    let styles: Vec<Style> = labels
        .iter()
        .map(|label| Style::new(label, SpeakerProfile::canonical_color_for_label(label)))
        .collect();

    let events: Vec<Event> = events
        .into_iter()
        .map(|mut event| {
            let color = styles
                .iter()
                .find(|s| s.label == event.speaker_label)
                .map(|s| s.primary_color.clone())
                .unwrap_or_else(|| "#FFFFFF".to_string());
            event.formatting_overlay = Some(FormattingOverlay::standard(&color));
            event.text = emphasize_text(&event.text, &color);
            event
        })
        .collect();

    SubtitleDocument::new(styles, events)
}

/// Wrap emphasized tokens with an inline override restoring speaker color at bold/size+2
/// (§4.10 phase 4). Matching is per-token, case-insensitive, against the emphasis lexicon;
/// only the matching token(s) are wrapped, not the surrounding text.
fn emphasize_text(text: &str, color: &str) -> String {
    if !contains_emphasis(text) {
        return text.to_string();
    }
    let ass_color = clipcast_models::timestamp::hex_to_ass_color(color).unwrap_or_else(|_| color.to_string());
    text.split(' ')
        .map(|token| {
            let lower = token.to_lowercase();
            if EMPHASIS_LEXICON.iter().any(|term| lower.contains(term)) {
                format!("{{\\c{ass_color}\\b1\\fs+2}}{token}{{\\r}}")
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(speaker: &str, text: &str) -> EditedCaption {
        EditedCaption {
            speaker_label: speaker.to_string(),
            text: text.to_string(),
            start: None,
            end: None,
        }
    }

    fn timed_edit(speaker: &str, text: &str, start: f64, end: f64) -> EditedCaption {
        EditedCaption {
            speaker_label: speaker.to_string(),
            text: text.to_string(),
            start: Some(start),
            end: Some(end),
        }
    }

    fn d0_event(index: usize, start: f64, end: f64) -> Event {
        Event {
            index,
            speaker_label: "Speaker 1".to_string(),
            start,
            end,
            text: "orig".to_string(),
            formatting_overlay: None,
        }
    }

    #[test]
    fn test_timing_reconciliation_copies_exact_match() {
        let edited = vec![
            Event { index: 0, speaker_label: "Speaker 1".to_string(), start: 0.0, end: 0.0, text: "a".into(), formatting_overlay: None },
            Event { index: 1, speaker_label: "Speaker 1".to_string(), start: 0.0, end: 0.0, text: "b".into(), formatting_overlay: None },
        ];
        let d0 = SubtitleDocument::new(
            vec![Style::new("Speaker 1", "#FF4500")],
            vec![d0_event(0, 0.0, 1.0), d0_event(1, 1.2, 2.0)],
        );
        let (events, g_min) = timing_reconciliation(&edited, Some(&d0), 2.0);
        assert_eq!(events[0].start, 0.0);
        assert_eq!(events[0].end, 1.0);
        assert_eq!(events[1].start, 1.2);
        assert_eq!(g_min, G_MIN_MINIMAL_FIX);
    }

    #[test]
    fn test_timing_reconciliation_without_d0_redistributes_when_no_timing_provided() {
        let edited = normalize_phase(vec![edit("Speaker 1", "hello there")]);
        let clip_duration = 20.0;
        let (events, g_min) = timing_reconciliation(&edited, None, clip_duration);
        assert_eq!(g_min, G_MIN_REDISTRIBUTE);
        assert!(events[0].start >= 0.05 * clip_duration - 1e-9);
        assert!(events[0].start <= 0.90 * clip_duration + 1e-9);
    }

    #[test]
    fn test_timing_reconciliation_without_d0_keeps_provided_timing_above_coverage_floor() {
        let edited = normalize_phase(vec![timed_edit("Speaker 1", "hello there", 1.0, 9.0)]);
        let clip_duration = 10.0;
        let (events, g_min) = timing_reconciliation(&edited, None, clip_duration);
        assert_eq!(g_min, G_MIN_MINIMAL_FIX);
        assert_eq!(events[0].start, 1.0);
        assert_eq!(events[0].end, 9.0);
    }

    #[test]
    fn test_overlap_elimination_enforces_gap() {
        let events = vec![
            Event { index: 0, speaker_label: "Speaker 1".to_string(), start: 0.0, end: 1.5, text: "a".into(), formatting_overlay: None },
            Event { index: 1, speaker_label: "Speaker 1".to_string(), start: 1.4, end: 2.0, text: "b".into(), formatting_overlay: None },
        ];
        let fixed = overlap_elimination(events, G_MIN_MINIMAL_FIX);
        assert!(fixed[0].end <= fixed[1].start - G_MIN_MINIMAL_FIX + 1e-9);
    }

    #[test]
    fn test_overlap_elimination_floors_short_duration() {
        let events = vec![Event {
            index: 0,
            speaker_label: "Speaker 1".to_string(),
            start: 0.0,
            end: 0.1,
            text: "a".into(),
            formatting_overlay: None,
        }];
        let fixed = overlap_elimination(events, G_MIN_MINIMAL_FIX);
        assert!(fixed[0].end - fixed[0].start >= D_MIN - 1e-9);
    }

    #[test]
    fn test_style_materialization_assigns_canonical_colors() {
        let events = vec![
            Event { index: 0, speaker_label: "Speaker 1".to_string(), start: 0.0, end: 1.0, text: "hi".into(), formatting_overlay: None },
            Event { index: 1, speaker_label: "Speaker 2".to_string(), start: 1.0, end: 2.0, text: "yo".into(), formatting_overlay: None },
        ];
        let document = style_materialization(events);
        assert_eq!(document.styles.len(), 2);
        assert_eq!(document.style_for("Speaker 1").unwrap().primary_color, "#FF4500");
        assert_eq!(document.style_for("Speaker 2").unwrap().primary_color, "#1E90FF");
    }

    #[test]
    fn test_style_materialization_keys_color_on_label_not_appearance_order() {
        // Speaker 2 appears first here, but must still come out blue, not red.
        let events = vec![
            Event { index: 0, speaker_label: "Speaker 2".to_string(), start: 0.0, end: 1.0, text: "hi".into(), formatting_overlay: None },
            Event { index: 1, speaker_label: "Speaker 1".to_string(), start: 1.0, end: 2.0, text: "yo".into(), formatting_overlay: None },
        ];
        let document = style_materialization(events);
        assert_eq!(document.style_for("Speaker 1").unwrap().primary_color, "#FF4500");
        assert_eq!(document.style_for("Speaker 2").unwrap().primary_color, "#1E90FF");
    }

    #[test]
    fn test_style_materialization_assigns_white_to_other_labels() {
        let events = vec![Event {
            index: 0,
            speaker_label: "Speaker 5".to_string(),
            start: 0.0,
            end: 1.0,
            text: "hi".into(),
            formatting_overlay: None,
        }];
        let document = style_materialization(events);
        assert_eq!(document.style_for("Speaker 5").unwrap().primary_color, "#FFFFFF");
    }

    #[test]
    fn test_emphasize_text_wraps_matching_term() {
        let wrapped = emphasize_text("that was epic", "#FF4500");
        assert!(wrapped.contains("\\b1"));
    }

    #[test]
    fn test_emphasize_text_only_wraps_the_matching_token() {
        let wrapped = emphasize_text("that was epic honestly", "#FF4500");
        assert!(wrapped.starts_with("that was "));
        assert!(wrapped.ends_with(" honestly"));
        assert_eq!(wrapped.matches("\\b1").count(), 1);
    }

    #[test]
    fn test_normalize_phase_preserves_order() {
        let edited = vec![edit("Speaker 1", "hello there"), edit("Speaker 1", "friend")];
        let normalized = normalize_phase(edited);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].index, 0);
        assert_eq!(normalized[1].index, 1);
    }
}
