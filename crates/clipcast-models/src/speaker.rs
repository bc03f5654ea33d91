//! Speaker profiles and crop zones produced by the speaker/crop planner (§3, §4.6).

use serde::{Deserialize, Serialize};

/// A detected face bounding box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FaceBox {
    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }
}

/// The 9:16 crop window (in source-frame coordinates) used by the render pipeline's
/// `extract` operation for one speaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropZone {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Canonical speaker identity for one face cluster, immutable after creation (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    pub id: u8,
    pub label: String,
    pub color: String,
    pub face_center: f64,
    pub face_box: Option<FaceBox>,
    pub crop_zone: CropZone,
}

impl SpeakerProfile {
    /// The canonical palette assigned by speaker index (§4.10 phase 4): `Speaker 1` ->
    /// fire-red-orange, `Speaker 2` -> electric-blue, `Speaker 3` -> neon-green, else white.
    pub fn canonical_color(speaker_index: u8) -> &'static str {
        match speaker_index {
            0 => "#FF4500",
            1 => "#1E90FF",
            2 => "#39FF14",
            _ => "#FFFFFF",
        }
    }

    pub fn label_for(speaker_index: u8) -> String {
        format!("Speaker {}", speaker_index + 1)
    }

    /// Same palette as [`Self::canonical_color`], but keyed on the label's own identity
    /// (`"Speaker N"` -> `canonical_color(N-1)`) rather than on appearance order, per §4.10
    /// phase 4. Labels that don't parse as `Speaker <N>` fall back to white.
    pub fn canonical_color_for_label(label: &str) -> &'static str {
        label
            .strip_prefix("Speaker ")
            .and_then(|n| n.trim().parse::<u32>().ok())
            .and_then(|n| n.checked_sub(1))
            .map(|idx| Self::canonical_color(idx.min(u8::MAX as u32) as u8))
            .unwrap_or("#FFFFFF")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_color_assignment() {
        assert_eq!(SpeakerProfile::canonical_color(0), "#FF4500");
        assert_eq!(SpeakerProfile::canonical_color(1), "#1E90FF");
        assert_eq!(SpeakerProfile::canonical_color(2), "#39FF14");
        assert_eq!(SpeakerProfile::canonical_color(9), "#FFFFFF");
    }

    #[test]
    fn test_canonical_color_for_label_keys_on_label_not_appearance() {
        assert_eq!(SpeakerProfile::canonical_color_for_label("Speaker 1"), "#FF4500");
        assert_eq!(SpeakerProfile::canonical_color_for_label("Speaker 2"), "#1E90FF");
        assert_eq!(SpeakerProfile::canonical_color_for_label("Speaker 3"), "#39FF14");
        assert_eq!(SpeakerProfile::canonical_color_for_label("Speaker 5"), "#FFFFFF");
        assert_eq!(SpeakerProfile::canonical_color_for_label("Narrator"), "#FFFFFF");
    }

    #[test]
    fn test_face_box_center() {
        let fb = FaceBox { x: 100.0, y: 0.0, w: 50.0, h: 50.0 };
        assert_eq!(fb.center_x(), 125.0);
    }
}
