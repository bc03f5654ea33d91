//! Phrase assembler (§4.8): turns transcriber segments into 2-4 word, speaker-attributed
//! [`PhraseSegment`]s suitable for burned-in captions.

use clipcast_capability::{TranscriptSegment, WordTiming};
use clipcast_models::{PhraseSegment, SpeakerProfile};

const PHRASE_MAX_WORDS: usize = 4;
const BREAK_TOKENS: &[&str] = &["and", "but", "or", "so", "then", "well", "yeah", "ok"];
const AGGRESSIVE_WORDS: &[&str] =
    &["fucking", "shit", "damn", "crazy", "insane", "ridiculous", "what the hell"];
const QUESTION_STARTERS: &[&str] = &["what", "why", "how", "is", "was", "did"];

/// Assemble phrases for a whole transcript, assigning speakers per §4.8.
pub fn assemble_phrases(segments: &[TranscriptSegment]) -> Vec<PhraseSegment> {
    let total = segments.len();
    let mut phrases = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let speaker_id = assign_speaker(segment, i, total);
        let speaker_label = SpeakerProfile::label_for(speaker_id);
        let speaker_color = SpeakerProfile::canonical_color(speaker_id);

        match &segment.words {
            Some(words) if !words.is_empty() => {
                for phrase in phrases_from_words(words) {
                    phrases.push(PhraseSegment::new(
                        phrase.text,
                        phrase.start,
                        phrase.end,
                        speaker_id,
                        speaker_label.clone(),
                        speaker_color,
                    ));
                }
            }
            _ => {
                phrases.push(PhraseSegment::new(
                    segment.text.clone(),
                    segment.start,
                    segment.end,
                    speaker_id,
                    speaker_label.clone(),
                    speaker_color,
                ));
            }
        }
    }

    phrases
}

struct RawPhrase {
    text: String,
    start: f64,
    end: f64,
}

/// Accumulate word timings into phrases per the three emission rules of §4.8.
fn phrases_from_words(words: &[WordTiming]) -> Vec<RawPhrase> {
    let mut phrases = Vec::new();
    let mut bucket: Vec<&WordTiming> = Vec::new();

    for (i, word) in words.iter().enumerate() {
        bucket.push(word);
        let is_last = i == words.len() - 1;
        let ends_sentence = word.text.ends_with([',', '.', '!', '?', ':']);
        let is_break_token = BREAK_TOKENS
            .iter()
            .any(|t| t.eq_ignore_ascii_case(trim_punctuation(&word.text)));

        let should_emit = bucket.len() >= PHRASE_MAX_WORDS
            || (bucket.len() >= 2 && (ends_sentence || is_break_token))
            || is_last;

        if should_emit {
            let text = bucket.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            let start = bucket.first().unwrap().start;
            let end = bucket.last().unwrap().end;
            phrases.push(RawPhrase { text, start, end });
            bucket.clear();
        }
    }

    phrases
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Speaker assignment per §4.8, applied when the transcript lacks explicit diarization.
fn assign_speaker(segment: &TranscriptSegment, index: usize, total: usize) -> u8 {
    let lower = segment.text.to_lowercase();

    if AGGRESSIVE_WORDS.iter().any(|w| lower.contains(w)) {
        return 0;
    }

    let starts_with_question_word = QUESTION_STARTERS
        .iter()
        .any(|w| lower.trim_start().starts_with(w));
    if lower.contains('?') || starts_with_question_word {
        return 0;
    }

    let word_count = segment.text.split_whitespace().count();
    if word_count > 8 {
        return 1;
    }

    if index < total / 2 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> WordTiming {
        WordTiming { text: text.to_string(), start, end }
    }

    fn segment(text: &str, start: f64, end: f64, words: Option<Vec<WordTiming>>) -> TranscriptSegment {
        TranscriptSegment { text: text.to_string(), start, end, words }
    }

    #[test]
    fn test_no_word_timings_emits_one_phrase() {
        let segments = vec![segment("hello there friend", 0.0, 2.0, None)];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text, "hello there friend");
    }

    #[test]
    fn test_emits_at_four_words() {
        let words = vec![
            word("one", 0.0, 0.2),
            word("two", 0.2, 0.4),
            word("three", 0.4, 0.6),
            word("four", 0.6, 0.8),
            word("five", 0.8, 1.0),
        ];
        let segments = vec![segment("one two three four five", 0.0, 1.0, Some(words))];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].text, "one two three four");
        assert_eq!(phrases[1].text, "five");
    }

    #[test]
    fn test_emits_on_break_token() {
        let words = vec![word("wait", 0.0, 0.2), word("so", 0.2, 0.4), word("crazy", 0.4, 0.6)];
        let segments = vec![segment("wait so crazy", 0.0, 0.6, Some(words))];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].text, "wait so");
        assert_eq!(phrases[1].text, "crazy");
    }

    #[test]
    fn test_aggressive_words_assign_speaker_zero() {
        let segments = vec![segment("that is so crazy", 0.0, 1.0, None)];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases[0].speaker_id, 0);
    }

    #[test]
    fn test_question_assigns_speaker_zero() {
        let segments = vec![segment("what happened here", 0.0, 1.0, None)];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases[0].speaker_id, 0);
    }

    #[test]
    fn test_long_segment_assigns_speaker_one() {
        let text = "this is a fairly long segment with more than eight words total";
        let segments = vec![segment(text, 0.0, 3.0, None)];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases[0].speaker_id, 1);
    }

    #[test]
    fn test_halves_split_when_no_other_rule_applies() {
        let segments = vec![
            segment("calm first half", 0.0, 1.0, None),
            segment("calm second half", 1.0, 2.0, None),
            segment("calm third half", 2.0, 3.0, None),
            segment("calm fourth half", 3.0, 4.0, None),
        ];
        let phrases = assemble_phrases(&segments);
        assert_eq!(phrases[0].speaker_id, 1);
        assert_eq!(phrases[1].speaker_id, 1);
        assert_eq!(phrases[2].speaker_id, 0);
        assert_eq!(phrases[3].speaker_id, 0);
    }
}
