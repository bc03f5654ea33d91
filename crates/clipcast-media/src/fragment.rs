//! Caption fragment normalizer (§4.3): merges runs of same-speaker short fragments (clients
//! that send captions one or two letters at a time) into single events.

use clipcast_models::Event;

/// Mean text length threshold below which the batch is eligible for merging.
const FRAG_MEAN: f64 = 5.0;

/// Merge short same-speaker fragment runs in `events`. A fragment qualifies as "short" when it
/// is at most 3 characters, or at most 8 characters and ends in `,`. Only maximal runs of
/// consecutive same-speaker qualifying fragments are merged; a non-qualifying fragment starts
/// its own event and never joins a run. Idempotent: re-applying to an already-normalized list
/// is a no-op, since merged events are no longer short fragments themselves.
pub fn normalize_fragments(events: Vec<Event>) -> Vec<Event> {
    if events.is_empty() {
        return events;
    }

    let mean_len = events.iter().map(|e| e.text.chars().count()).sum::<usize>() as f64 / events.len() as f64;
    if mean_len >= FRAG_MEAN {
        return reindexed(events);
    }

    let mut merged: Vec<Event> = Vec::with_capacity(events.len());
    let mut run_active = false;

    for event in events {
        let qualifies = is_short_fragment(&event.text);
        let continues_run = run_active
            && qualifies
            && merged.last().map(|prev| prev.speaker_label == event.speaker_label).unwrap_or(false);

        if continues_run {
            let prev = merged.last_mut().unwrap();
            prev.text = join_fragment_text(&prev.text, &event.text);
            prev.end = event.end;
        } else {
            merged.push(event);
            run_active = qualifies;
        }
    }

    reindexed(merged)
}

fn is_short_fragment(text: &str) -> bool {
    let len = text.chars().count();
    len <= 3 || (len <= 8 && text.ends_with(','))
}

fn join_fragment_text(prev: &str, next: &str) -> String {
    let needs_space = !matches!(next.chars().next(), Some(c) if ",.!?:;".contains(c));
    if needs_space && !prev.is_empty() {
        format!("{prev} {next}")
    } else {
        format!("{prev}{next}")
    }
}

fn reindexed(mut events: Vec<Event>) -> Vec<Event> {
    for (i, event) in events.iter_mut().enumerate() {
        event.index = i;
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(index: usize, speaker: &str, text: &str, start: f64, end: f64) -> Event {
        Event {
            index,
            speaker_label: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
            formatting_overlay: None,
        }
    }

    #[test]
    fn test_merges_short_same_speaker_run() {
        let events = vec![
            ev(0, "Speaker 1", "h", 0.0, 0.2),
            ev(1, "Speaker 1", "i,", 0.2, 0.4),
            ev(2, "Speaker 1", "yo", 0.4, 0.6),
        ];
        let merged = normalize_fragments(events);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "h i, yo");
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 0.6);
    }

    #[test]
    fn test_non_qualifying_fragment_breaks_the_run() {
        let events = vec![
            ev(0, "Speaker 1", "h", 0.0, 0.2),
            ev(1, "Speaker 1", "i,", 0.2, 0.4),
            ev(2, "Speaker 1", "there friend", 0.4, 0.8),
        ];
        let merged = normalize_fragments(events);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "h i,");
        assert_eq!(merged[1].text, "there friend");
    }

    #[test]
    fn test_never_merges_across_speakers() {
        let events = vec![ev(0, "Speaker 1", "h", 0.0, 0.2), ev(1, "Speaker 2", "i", 0.2, 0.4)];
        let merged = normalize_fragments(events);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_does_not_merge_when_mean_length_is_high() {
        let events = vec![
            ev(0, "Speaker 1", "this is a long caption", 0.0, 1.0),
            ev(1, "Speaker 1", "another long caption here", 1.0, 2.0),
        ];
        let merged = normalize_fragments(events.clone());
        assert_eq!(merged.len(), events.len());
    }

    #[test]
    fn test_idempotent() {
        let events = vec![
            ev(0, "Speaker 1", "h", 0.0, 0.2),
            ev(1, "Speaker 1", "i,", 0.2, 0.4),
            ev(2, "Speaker 1", "yo", 0.4, 0.6),
        ];
        let once = normalize_fragments(events);
        let twice = normalize_fragments(once.clone());
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].text, twice[0].text);
    }
}
