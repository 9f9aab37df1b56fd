//! Throttled capture/recognize control loop.
//!
//! This module provides:
//! - The per-activation session state machine with stale-result tracking
//! - Channels between the coordinator and the recognition worker
//! - The worker running OCR/parse/decide off the coordinator thread
//! - The loop runner enforcing at-most-one-in-flight and retry pacing

pub mod queue;
pub mod runner;
pub mod session;
pub mod worker;

pub use queue::{AttemptOutcome, RecognitionJob};
pub use runner::{run_recognition_loop, Coordinator, LoopHandle, TickOutcome};
pub use session::{AttemptDisposition, RecognitionSession, RecognitionState};
pub use worker::run_recognition_worker;
