//! Phrase segments produced by the phrase assembler (§3, §4.8).

use serde::{Deserialize, Serialize};

/// The emphasis lexicon fixed by §4.8 (case-insensitive match against phrase text).
pub const EMPHASIS_LEXICON: &[&str] = &[
    "fucking",
    "shit",
    "damn",
    "crazy",
    "insane",
    "ridiculous",
    "amazing",
    "incredible",
    "awesome",
    "epic",
    "legendary",
];

/// A 2-4 word, speaker-attributed, time-bounded caption candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub speaker_id: u8,
    pub speaker_label: String,
    pub speaker_color: String,
    pub is_emphasized: bool,
}

impl PhraseSegment {
    pub fn new(
        text: impl Into<String>,
        start: f64,
        end: f64,
        speaker_id: u8,
        speaker_label: impl Into<String>,
        speaker_color: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let is_emphasized = contains_emphasis(&text);
        Self {
            text,
            start,
            end,
            speaker_id,
            speaker_label: speaker_label.into(),
            speaker_color: speaker_color.into(),
            is_emphasized,
        }
    }
}

/// True iff `text` (case-insensitively) contains any term from [`EMPHASIS_LEXICON`].
pub fn contains_emphasis(text: &str) -> bool {
    let lower = text.to_lowercase();
    EMPHASIS_LEXICON.iter().any(|term| lower.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_emphasis_case_insensitive() {
        assert!(contains_emphasis("that was EPIC"));
        assert!(!contains_emphasis("that was fine"));
    }

    #[test]
    fn test_new_sets_emphasis_flag() {
        let phrase = PhraseSegment::new("so crazy right now", 0.0, 1.0, 0, "Speaker 1", "#FF4500");
        assert!(phrase.is_emphasized);
    }
}
