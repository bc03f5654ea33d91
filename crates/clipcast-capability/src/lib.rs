//! HTTP capability clients the core treats as pure external collaborators (§4.7, §4.6, §6):
//! transcription and face detection. Neither is implemented in-process; the core calls out
//! over HTTP and maps transport/service failures onto the shared error-kind taxonomy.

pub mod error;
pub mod face_detector;
pub mod transcriber;

pub use error::{CapabilityError, CapabilityResult};
pub use face_detector::FaceDetectorClient;
pub use transcriber::{TranscriberClient, TranscriptSegment, WordTiming};
