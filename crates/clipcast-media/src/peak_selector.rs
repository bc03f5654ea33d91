//! Peak selector (§4.5): chooses a start offset for the clip window given a probed source
//! duration and a target clip duration. Purely heuristic and deterministic given its inputs.

/// Duration class boundaries, in seconds.
const LONG_FORM_MIN: f64 = 1800.0;
const MEDIUM_FORM_MIN: f64 = 600.0;
const SHORT_FORM_MIN: f64 = 180.0;

/// Fixed confidence assigned when the caller pins a start offset, bypassing selection.
pub const PINNED_CONFIDENCE: f64 = 0.5;

/// A chosen start offset and the selector's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWindow {
    pub start_offset: f64,
    pub confidence: f64,
}

/// Select a peak window. If `pinned_start` is `Some`, selection is bypassed.
pub fn select_peak(duration: f64, target_duration: f64, pinned_start: Option<f64>) -> PeakWindow {
    if let Some(start) = pinned_start {
        return PeakWindow {
            start_offset: start,
            confidence: PINNED_CONFIDENCE,
        };
    }

    let candidates = candidate_offsets(duration);
    let usable_end = (duration - target_duration).max(0.0);

    let mut best = PeakWindow {
        start_offset: 0.0,
        confidence: f64::MIN,
    };

    for offset in candidates {
        let offset = offset.clamp(0.0, usable_end);
        let score = score_offset(duration, offset);
        if score > best.confidence
            || (score == best.confidence && offset < best.start_offset)
        {
            best = PeakWindow {
                start_offset: offset,
                confidence: score.clamp(0.0, 1.0),
            };
        }
    }

    best
}

fn candidate_offsets(duration: f64) -> Vec<f64> {
    if duration >= LONG_FORM_MIN {
        vec![120.0, 180.0, 300.0, 420.0, duration * 0.25, duration * 0.40, duration * 0.60]
    } else if duration >= MEDIUM_FORM_MIN {
        let scale = duration / LONG_FORM_MIN;
        vec![
            120.0 * scale,
            180.0 * scale,
            300.0 * scale,
            420.0 * scale,
            duration * 0.25,
            duration * 0.40,
            duration * 0.60,
        ]
    } else if duration >= SHORT_FORM_MIN {
        vec![duration * 0.40, duration * 0.50, duration * 0.60]
    } else {
        vec![duration * 0.15, duration * 0.35, duration * 0.55, duration * 0.75]
    }
}

/// Position affinity minus a proximity penalty to the endpoints; higher is better.
fn score_offset(duration: f64, offset: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    let position = offset / duration;

    let affinity = if duration >= MEDIUM_FORM_MIN {
        // Opening-hook band favored for long/medium form.
        1.0 - (position - 0.30).abs()
    } else if duration >= SHORT_FORM_MIN {
        // Mid favored for short form.
        1.0 - (position - 0.50).abs() * 1.2
    } else {
        // Very short: flatter preference curve.
        1.0 - (position - 0.40).abs() * 0.8
    };

    let proximity_penalty = if position < 0.05 {
        0.05 - position
    } else if position > 0.95 {
        position - 0.95
    } else {
        0.0
    };

    affinity - proximity_penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_start_bypasses_selection() {
        let window = select_peak(3600.0, 60.0, Some(42.0));
        assert_eq!(window.start_offset, 42.0);
        assert_eq!(window.confidence, PINNED_CONFIDENCE);
    }

    #[test]
    fn test_long_form_picks_within_usable_range() {
        let window = select_peak(3600.0, 60.0, None);
        assert!(window.start_offset >= 0.0);
        assert!(window.start_offset <= 3540.0);
    }

    #[test]
    fn test_confidence_is_in_unit_range() {
        for duration in [60.0, 300.0, 900.0, 3600.0, 7200.0] {
            let window = select_peak(duration, 30.0, None);
            assert!(window.confidence >= 0.0 && window.confidence <= 1.0);
        }
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let a = select_peak(2400.0, 45.0, None);
        let b = select_peak(2400.0, 45.0, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_very_short_form_candidates_bounded() {
        let window = select_peak(90.0, 20.0, None);
        assert!(window.start_offset <= 70.0);
    }
}
