//! Cut schedule data model (§3, §4.6).

use serde::{Deserialize, Serialize};

/// Nominal segment length used by the speaker-switching cut schedule (§4.6). The spec leaves
/// this value as an open tunable rather than wiring it to configuration.
pub const CUT_SCHEDULE_NOMINAL_SECS: f64 = 3.5;

/// One segment of source footage attributed to a single speaker's crop zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutScheduleEntry {
    pub source_offset: f64,
    pub duration: f64,
    pub speaker_id: u8,
}

/// An ordered list of cuts whose durations sum to the job's target duration (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutSchedule {
    pub entries: Vec<CutScheduleEntry>,
}

impl CutSchedule {
    pub fn new(entries: Vec<CutScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(|e| e.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_duration_sums_entries() {
        let schedule = CutSchedule::new(vec![
            CutScheduleEntry { source_offset: 0.0, duration: 3.5, speaker_id: 0 },
            CutScheduleEntry { source_offset: 3.5, duration: 3.5, speaker_id: 1 },
            CutScheduleEntry { source_offset: 7.0, duration: 2.5, speaker_id: 0 },
        ]);
        assert!((schedule.total_duration() - 9.5).abs() < 1e-9);
    }
}
