#![deny(unreachable_patterns)]
//! Pipeline stage functions and phrase assembly for the clip-production core.
//!
//! This crate provides:
//! - Stage functions composing `clipcast-media` and `clipcast-capability` calls, sequenced by
//!   the orchestrator's per-job `tokio::spawn` task (§4.11, §4.14)
//! - The phrase assembler turning transcript segments into speaker-attributed captions (§4.8)
//! - Per-stage timeout configuration and structured job logging

pub mod config;
pub mod error;
pub mod logging;
pub mod phrase_assembler;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use phrase_assembler::assemble_phrases;
