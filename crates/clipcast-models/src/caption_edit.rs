//! Caption edit wire shape accepted by `update_captions` (§6).

use serde::{Deserialize, Serialize};

/// One client-submitted caption edit. `start_time`/`end_time` are in the styled variant's
/// `H:MM:SS.CC` format (§6); callers that omit timing submit the segment text only and let
/// the regeneration engine derive timing per §4.10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEdit {
    pub index: usize,
    pub text: String,
    pub speaker_label: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}
