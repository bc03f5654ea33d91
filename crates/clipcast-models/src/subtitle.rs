//! In-memory subtitle document model (§3, §4.2).
//!
//! Two wire formats (styled `.ass`-like and simple `.srt`-like) serialize to and from this
//! shared representation; the parsers/writers themselves live in `clipcast-media::subtitle_io`.

use serde::{Deserialize, Serialize};

/// Which wire format a subtitle document was read from or should be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    Styled,
    Simple,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Styled => "styled",
            SubtitleFormat::Simple => "simple",
        }
    }
}

/// A named caption style, keyed by speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub label: String,
    /// `#RRGGBB`.
    pub primary_color: String,
    pub font: String,
    pub size: u32,
    pub outline: u32,
    pub shadow: u32,
    pub alignment: u8,
}

impl Style {
    pub fn new(label: impl Into<String>, primary_color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            primary_color: primary_color.into(),
            font: "Arial".to_string(),
            size: 36,
            outline: 2,
            shadow: 0,
            alignment: 2,
        }
    }
}

/// A fade/scale-pop/color overlay attached to an event, materialized by the regeneration
/// engine (§4.10 phase 4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattingOverlay {
    pub fade_in_ms: u32,
    pub scale_pop_from_pct: u32,
    pub scale_pop_start_ms: u32,
    pub scale_pop_end_ms: u32,
    pub primary_color: String,
}

impl FormattingOverlay {
    /// The standard overlay every regenerated event carries (§4.10 phase 4).
    pub fn standard(speaker_color: impl Into<String>) -> Self {
        Self {
            fade_in_ms: 150,
            scale_pop_from_pct: 110,
            scale_pop_start_ms: 300,
            scale_pop_end_ms: 400,
            primary_color: speaker_color.into(),
        }
    }
}

/// One caption line (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub index: usize,
    pub speaker_label: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub formatting_overlay: Option<FormattingOverlay>,
}

impl Event {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Errors produced when a subtitle document violates its own invariants (§3).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubtitleError {
    #[error("event {index} has start >= end ({start} >= {end})")]
    NonPositiveDuration { index: usize, start: f64, end: f64 },
    #[error("event {index} overlaps the following event: end {end} > next start {next_start} - {g_min}")]
    InsufficientGap {
        index: usize,
        end: f64,
        next_start: f64,
        g_min: f64,
    },
    #[error("event {index} references unknown speaker label '{label}'")]
    UnknownSpeaker { index: usize, label: String },
}

/// Ordered caption events plus the style table they reference (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleDocument {
    pub styles: Vec<Style>,
    pub events: Vec<Event>,
}

/// Minimum inter-caption gap enforced by the regeneration engine's overlap sweep (§4.10).
pub const G_MIN_MINIMAL_FIX: f64 = 0.05;
pub const G_MIN_REDISTRIBUTE: f64 = 0.1;
/// Minimum event duration (§4.10).
pub const D_MIN: f64 = 0.3;

impl SubtitleDocument {
    pub fn new(styles: Vec<Style>, events: Vec<Event>) -> Self {
        Self { styles, events }
    }

    pub fn style_for(&self, label: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.label == label)
    }

    /// Re-number `events[i].index` to 0-based consecutive order, matching document order.
    pub fn reindex(&mut self) {
        for (i, event) in self.events.iter_mut().enumerate() {
            event.index = i;
        }
    }

    /// Validate every invariant in §3 against the current event ordering.
    pub fn validate(&self, g_min: f64) -> Result<(), SubtitleError> {
        for (i, event) in self.events.iter().enumerate() {
            if event.start >= event.end {
                return Err(SubtitleError::NonPositiveDuration {
                    index: i,
                    start: event.start,
                    end: event.end,
                });
            }
            if self.style_for(&event.speaker_label).is_none() {
                return Err(SubtitleError::UnknownSpeaker {
                    index: i,
                    label: event.speaker_label.clone(),
                });
            }
            if let Some(next) = self.events.get(i + 1) {
                if event.end > next.start - g_min {
                    return Err(SubtitleError::InsufficientGap {
                        index: i,
                        end: event.end,
                        next_start: next.start,
                        g_min,
                    });
                }
            }
        }
        Ok(())
    }

    /// Project to a client-facing caption list, stripping inline formatting overrides (§4.2).
    pub fn to_caption_list(&self) -> Vec<(usize, String, String, f64, f64)> {
        self.events
            .iter()
            .map(|e| {
                (
                    e.index,
                    e.speaker_label.clone(),
                    strip_inline_overrides(&e.text),
                    e.start,
                    e.end,
                )
            })
            .collect()
    }
}

/// Remove ASS-style `{...}` inline override groups from caption text (§4.2).
pub fn strip_inline_overrides(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0u32;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_events(events: Vec<Event>) -> SubtitleDocument {
        SubtitleDocument::new(vec![Style::new("Speaker 1", "#FF4500")], events)
    }

    fn event(index: usize, start: f64, end: f64) -> Event {
        Event {
            index,
            speaker_label: "Speaker 1".to_string(),
            start,
            end,
            text: "hello".to_string(),
            formatting_overlay: None,
        }
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let doc = doc_with_events(vec![event(0, 0.0, 2.0), event(1, 2.01, 4.0)]);
        let result = doc.validate(G_MIN_MINIMAL_FIX);
        assert!(matches!(result, Err(SubtitleError::InsufficientGap { .. })));
    }

    #[test]
    fn test_validate_accepts_sufficient_gap() {
        let doc = doc_with_events(vec![event(0, 0.0, 2.0), event(1, 2.2, 4.0)]);
        assert!(doc.validate(G_MIN_MINIMAL_FIX).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_speaker() {
        let mut doc = doc_with_events(vec![event(0, 0.0, 2.0)]);
        doc.events[0].speaker_label = "Speaker 9".to_string();
        assert!(matches!(
            doc.validate(G_MIN_MINIMAL_FIX),
            Err(SubtitleError::UnknownSpeaker { .. })
        ));
    }

    #[test]
    fn test_strip_inline_overrides() {
        assert_eq!(strip_inline_overrides("{\\b1}hello{\\b0} world"), "hello world");
    }

    #[test]
    fn test_reindex() {
        let mut doc = doc_with_events(vec![event(5, 0.0, 1.0), event(9, 1.0, 2.0)]);
        doc.reindex();
        assert_eq!(doc.events[0].index, 0);
        assert_eq!(doc.events[1].index, 1);
    }
}
