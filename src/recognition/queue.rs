//! Channels between the loop coordinator and the recognition worker.
//!
//! Uses std::sync::mpsc for single-producer, single-consumer communication.
//! The coordinator sends captured frames one way; the worker sends exactly
//! one outcome back per frame. Outcomes carry the attempt id so the
//! coordinator can recognize and drop stale deliveries.

use chrono::{DateTime, Local};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::sign::ParkVerdict;

/// A captured frame queued for recognition.
#[derive(Debug, Clone)]
pub struct RecognitionJob {
    /// Attempt id issued by the session
    pub attempt: u64,
    /// Raw image bytes; dropped once OCR completes
    pub image: Vec<u8>,
    /// Timestamp when the frame was captured
    pub captured_at: DateTime<Local>,
}

impl RecognitionJob {
    pub fn new(attempt: u64, image: Vec<u8>) -> Self {
        Self {
            attempt,
            image,
            captured_at: Local::now(),
        }
    }
}

/// The result of one recognition attempt.
///
/// `verdict` is None when the attempt was not confident: the OCR produced no
/// text, or the text parsed to nothing decisive. The loop keeps trying.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub attempt: u64,
    pub verdict: Option<ParkVerdict>,
}

pub fn create_job_channel() -> (Sender<RecognitionJob>, Receiver<RecognitionJob>) {
    channel()
}

pub fn create_outcome_channel() -> (Sender<AttemptOutcome>, Receiver<AttemptOutcome>) {
    channel()
}
