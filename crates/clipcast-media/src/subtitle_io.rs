//! Subtitle document parser/writer (§4.2): styled (`.ass`-like) and simple (`.srt`-like)
//! wire formats, both serializing to and from `clipcast_models::SubtitleDocument`.
//!
//! Parser contract: malformed dialogue rows are skipped with a logged warning rather than
//! failing the whole read. Writer contract: round-tripping an unedited document is byte-stable
//! modulo insignificant whitespace.

use clipcast_models::timestamp::{
    ass_color_to_hex, format_ass_timestamp, format_srt_timestamp, hex_to_ass_color,
    parse_ass_timestamp, parse_srt_timestamp,
};
use clipcast_models::{Event, FormattingOverlay, Style, SubtitleDocument, SubtitleFormat};
use tracing::warn;

use crate::error::{MediaError, MediaResult};

const SCRIPT_INFO_HEADER: &str = "[Script Info]";
const STYLES_HEADER: &str = "[V4+ Styles]";
const EVENTS_HEADER: &str = "[Events]";

/// Parse a subtitle document of the given variant from `content`.
pub fn read_subtitle_document(content: &str, variant: SubtitleFormat) -> MediaResult<SubtitleDocument> {
    match variant {
        SubtitleFormat::Styled => read_styled(content),
        SubtitleFormat::Simple => read_simple(content),
    }
}

/// Serialize `document` as the given variant.
pub fn write_subtitle_document(document: &SubtitleDocument, variant: SubtitleFormat) -> String {
    match variant {
        SubtitleFormat::Styled => write_styled(document),
        SubtitleFormat::Simple => write_simple(document),
    }
}

fn read_styled(content: &str) -> MediaResult<SubtitleDocument> {
    let mut styles = Vec::new();
    let mut events = Vec::new();
    let mut section = "";

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            section = if line.eq_ignore_ascii_case(SCRIPT_INFO_HEADER) {
                "info"
            } else if line.eq_ignore_ascii_case(STYLES_HEADER) {
                "styles"
            } else if line.eq_ignore_ascii_case(EVENTS_HEADER) {
                "events"
            } else {
                ""
            };
            continue;
        }

        match section {
            "styles" => {
                if let Some(rest) = line.strip_prefix("Style:") {
                    match parse_style_row(rest) {
                        Ok(style) => styles.push(style),
                        Err(e) => warn!("skipping malformed Style row: {}", e),
                    }
                }
            }
            "events" => {
                if let Some(rest) = line.strip_prefix("Dialogue:") {
                    match parse_dialogue_row(rest, events.len()) {
                        Ok(event) => events.push(event),
                        Err(e) => warn!("skipping malformed Dialogue row: {}", e),
                    }
                }
            }
            _ => {}
        }
    }

    Ok(SubtitleDocument::new(styles, events))
}

fn parse_style_row(rest: &str) -> Result<Style, String> {
    let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
    if fields.len() < 7 {
        return Err(format!("expected >=7 fields, found {}", fields.len()));
    }
    let primary_color =
        ass_color_to_hex(fields[2]).map_err(|e| e.to_string()).unwrap_or_else(|_| fields[2].to_string());
    Ok(Style {
        label: fields[0].to_string(),
        primary_color,
        font: fields[1].to_string(),
        size: fields[3].parse().unwrap_or(36),
        outline: fields[4].parse().unwrap_or(2),
        shadow: fields[5].parse().unwrap_or(0),
        alignment: fields[6].parse().unwrap_or(2),
    })
}

fn parse_dialogue_row(rest: &str, index: usize) -> Result<Event, String> {
    let fields: Vec<&str> = rest.splitn(10, ',').map(str::trim).collect();
    if fields.len() < 10 {
        return Err(format!("expected 10 fields, found {}", fields.len()));
    }
    let start = parse_ass_timestamp(fields[1]).map_err(|e| e.to_string())?;
    let end = parse_ass_timestamp(fields[2]).map_err(|e| e.to_string())?;
    let speaker_label = fields[3].to_string();
    let text = fields[9].to_string();
    Ok(Event {
        index,
        speaker_label,
        start,
        end,
        text,
        formatting_overlay: None,
    })
}

fn write_styled(document: &SubtitleDocument) -> String {
    let mut out = String::new();
    out.push_str(SCRIPT_INFO_HEADER);
    out.push('\n');
    out.push_str("ScriptType: v4.00+\n\n");

    out.push_str(STYLES_HEADER);
    out.push('\n');
    out.push_str("Format: Name, Fontname, PrimaryColour, Fontsize, Outline, Shadow, Alignment\n");
    for style in &document.styles {
        let ass_color = hex_to_ass_color(&style.primary_color).unwrap_or_else(|_| style.primary_color.clone());
        out.push_str(&format!(
            "Style: {},{},{},{},{},{},{}\n",
            style.label, style.font, ass_color, style.size, style.outline, style.shadow, style.alignment
        ));
    }
    out.push('\n');

    out.push_str(EVENTS_HEADER);
    out.push('\n');
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for event in &document.events {
        let text = apply_overlay_overrides(&event.text, event.formatting_overlay.as_ref());
        out.push_str(&format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
            format_ass_timestamp(event.start),
            format_ass_timestamp(event.end),
            event.speaker_label,
            text
        ));
    }

    out
}

/// Wrap emphasized runs of text with an inline override restoring `color` at bold/size+2,
/// matching the fade/scale-pop overlay materialized by the regeneration engine (§4.10 phase 4).
fn apply_overlay_overrides(text: &str, overlay: Option<&FormattingOverlay>) -> String {
    match overlay {
        Some(overlay) => {
            let ass_color = hex_to_ass_color(&overlay.primary_color).unwrap_or_else(|_| overlay.primary_color.clone());
            format!(
                "{{\\fad({},0)\\t(0,{},{},\\fscx{}\\fscy{})\\c{}}}{}",
                overlay.fade_in_ms,
                overlay.scale_pop_start_ms,
                overlay.scale_pop_end_ms,
                overlay.scale_pop_from_pct,
                overlay.scale_pop_from_pct,
                ass_color,
                text
            )
        }
        None => text.to_string(),
    }
}

fn read_simple(content: &str) -> MediaResult<SubtitleDocument> {
    let mut events = Vec::new();
    let blocks: Vec<&str> = content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()).collect();

    for block in blocks {
        match parse_simple_block(block, events.len()) {
            Ok(event) => events.push(event),
            Err(e) => warn!("skipping malformed simple subtitle block: {}", e),
        }
    }

    let mut styles = Vec::new();
    for event in &events {
        if !styles.iter().any(|s: &Style| s.label == event.speaker_label) {
            styles.push(Style::new(&event.speaker_label, "#FFFFFF"));
        }
    }

    Ok(SubtitleDocument::new(styles, events))
}

fn parse_simple_block(block: &str, index: usize) -> Result<Event, String> {
    let mut lines = block.lines();
    let _seq = lines.next().ok_or("missing sequence number line")?;
    let time_line = lines.next().ok_or("missing time range line")?;
    let (start_str, end_str) = time_line
        .split_once("-->")
        .ok_or_else(|| format!("missing '-->' in time range '{time_line}'"))?;
    let start = parse_srt_timestamp(start_str.trim()).map_err(|e| e.to_string())?;
    let end = parse_srt_timestamp(end_str.trim()).map_err(|e| e.to_string())?;

    let text_lines: Vec<&str> = lines.collect();
    if text_lines.is_empty() {
        return Err("missing text line".to_string());
    }
    let full_text = text_lines.join(" ");

    let (speaker_label, text) = match full_text.strip_prefix('[') {
        Some(rest) => match rest.split_once("] ") {
            Some((label, remainder)) => (label.to_string(), remainder.to_string()),
            None => ("Speaker 1".to_string(), full_text.clone()),
        },
        None => ("Speaker 1".to_string(), full_text.clone()),
    };

    Ok(Event {
        index,
        speaker_label,
        start,
        end,
        text,
        formatting_overlay: None,
    })
}

fn write_simple(document: &SubtitleDocument) -> String {
    let mut out = String::new();
    for (i, event) in document.events.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(event.start),
            format_srt_timestamp(event.end)
        ));
        if event.speaker_label != "Speaker 1" {
            out.push_str(&format!("[{}] {}\n", event.speaker_label, event.text));
        } else {
            out.push_str(&event.text);
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_round_trip() {
        let doc = SubtitleDocument::new(
            vec![Style::new("Speaker 1", "#FFFFFF")],
            vec![Event {
                index: 0,
                speaker_label: "Speaker 1".to_string(),
                start: 1.0,
                end: 2.5,
                text: "hello world".to_string(),
                formatting_overlay: None,
            }],
        );
        let written = write_simple(&doc);
        let parsed = read_subtitle_document(&written, SubtitleFormat::Simple).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].text, "hello world");
        assert!((parsed.events[0].start - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_simple_preserves_speaker_prefix() {
        let doc = SubtitleDocument::new(
            vec![Style::new("Speaker 2", "#1E90FF")],
            vec![Event {
                index: 0,
                speaker_label: "Speaker 2".to_string(),
                start: 0.0,
                end: 1.0,
                text: "hi".to_string(),
                formatting_overlay: None,
            }],
        );
        let written = write_simple(&doc);
        assert!(written.contains("[Speaker 2] hi"));
        let parsed = read_subtitle_document(&written, SubtitleFormat::Simple).unwrap();
        assert_eq!(parsed.events[0].speaker_label, "Speaker 2");
    }

    #[test]
    fn test_styled_round_trip_timings() {
        let doc = SubtitleDocument::new(
            vec![Style::new("Speaker 1", "#FF4500")],
            vec![Event {
                index: 0,
                speaker_label: "Speaker 1".to_string(),
                start: 5445.25,
                end: 5450.0,
                text: "so crazy".to_string(),
                formatting_overlay: None,
            }],
        );
        let written = write_styled(&doc);
        let parsed = read_subtitle_document(&written, SubtitleFormat::Styled).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert!((parsed.events[0].start - 5445.25).abs() < 0.01);
        assert_eq!(parsed.events[0].text, "so crazy");
    }

    #[test]
    fn test_malformed_dialogue_row_is_skipped_not_fatal() {
        let content = format!(
            "{}\n{}\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: garbage\nDialogue: 0,0:00:01.00,0:00:02.00,Speaker 1,,0,0,0,,ok\n",
            SCRIPT_INFO_HEADER, EVENTS_HEADER
        );
        let parsed = read_subtitle_document(&content, SubtitleFormat::Styled).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].text, "ok");
    }
}
