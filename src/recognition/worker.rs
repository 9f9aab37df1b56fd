//! Recognition worker thread.
//!
//! Receives captured frames from the coordinator and runs the slow half of
//! an attempt off the coordinator thread: OCR, parsing, and the decision.
//! Sends exactly one outcome back per frame. OCR failures and indecisive
//! text are non-confident outcomes, never errors; transient camera and
//! lighting problems are expected and must not end the session.

use chrono::Local;
use log::{debug, info};
use std::sync::mpsc::{Receiver, Sender};

use crate::ocr::TextRecognizer;
use crate::recognition::queue::{AttemptOutcome, RecognitionJob};
use crate::sign::{decide, parse, ParseOptions};

/// Runs the recognition worker loop.
///
/// Processes jobs until the job channel closes (coordinator dropped), then
/// exits. Blocks, so it should be run in a dedicated thread.
pub fn run_recognition_worker<R: TextRecognizer>(
    jobs: Receiver<RecognitionJob>,
    outcomes: Sender<AttemptOutcome>,
    recognizer: R,
    opts: ParseOptions,
) {
    debug!("Recognition worker started");

    while let Ok(job) = jobs.recv() {
        let attempt = job.attempt;
        let verdict = evaluate(&recognizer, &job, &opts);

        if outcomes.send(AttemptOutcome { attempt, verdict }).is_err() {
            // Coordinator is gone; nothing left to report to.
            break;
        }
    }

    debug!("Recognition worker finished");
}

/// OCR, parse, and decide for one frame. None means not confident.
fn evaluate<R: TextRecognizer>(
    recognizer: &R,
    job: &RecognitionJob,
    opts: &ParseOptions,
) -> Option<crate::sign::ParkVerdict> {
    debug!(
        "Attempt {}: recognizing frame captured at {}",
        job.attempt,
        job.captured_at.format("%H:%M:%S%.3f")
    );
    let text = match recognizer.recognize(&job.image) {
        Ok(text) => text,
        Err(e) => {
            debug!("Attempt {}: OCR failed: {}", job.attempt, e);
            return None;
        }
    };

    if text.trim().is_empty() {
        debug!("Attempt {}: no text recognized", job.attempt);
        return None;
    }

    let rules = parse(&text, opts);
    if !rules.iter().any(|rule| rule.is_decisive()) {
        debug!(
            "Attempt {}: {} rule(s), none decisive",
            job.attempt,
            rules.len()
        );
        return None;
    }

    let verdict = decide(&rules, Local::now());
    info!(
        "Attempt {}: {} rule(s) parsed, verdict: {}",
        job.attempt,
        rules.len(),
        verdict
    );
    Some(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::queue::{create_job_channel, create_outcome_channel};
    use crate::sign::ParkVerdict;
    use anyhow::anyhow;
    use std::thread;

    /// Recognizer that replays canned responses, one per frame.
    struct ScriptedRecognizer {
        responses: std::sync::Mutex<std::collections::VecDeque<anyhow::Result<String>>>,
    }

    impl ScriptedRecognizer {
        fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, _image: &[u8]) -> anyhow::Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn run_attempts(responses: Vec<anyhow::Result<String>>) -> Vec<AttemptOutcome> {
        let count = responses.len();
        let (job_tx, job_rx) = create_job_channel();
        let (out_tx, out_rx) = create_outcome_channel();

        let worker = thread::spawn(move || {
            run_recognition_worker(
                job_rx,
                out_tx,
                ScriptedRecognizer::new(responses),
                ParseOptions::default(),
            );
        });

        for attempt in 1..=count as u64 {
            job_tx.send(RecognitionJob::new(attempt, Vec::new())).unwrap();
        }
        drop(job_tx);

        let outcomes: Vec<_> = out_rx.iter().collect();
        worker.join().expect("Worker thread panicked");
        outcomes
    }

    #[test]
    fn test_confident_text_produces_verdict() {
        let outcomes = run_attempts(vec![Ok("NO PARKING ANY TIME".to_string())]);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempt, 1);
        assert!(matches!(
            outcomes[0].verdict,
            Some(ParkVerdict::CantPark { .. })
        ));
    }

    #[test]
    fn test_ocr_failure_is_not_confident() {
        let outcomes = run_attempts(vec![Err(anyhow!("engine unavailable"))]);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].verdict.is_none());
    }

    #[test]
    fn test_empty_text_is_not_confident() {
        let outcomes = run_attempts(vec![Ok(String::new())]);
        assert!(outcomes[0].verdict.is_none());
    }

    #[test]
    fn test_garbled_text_is_not_confident() {
        // Indecisive text keeps the loop alive rather than resolving to a
        // spurious verdict.
        let outcomes = run_attempts(vec![Ok("XYZ GARBLED TEXT".to_string())]);
        assert!(outcomes[0].verdict.is_none());
    }

    #[test]
    fn test_one_outcome_per_job_in_order() {
        let outcomes = run_attempts(vec![
            Ok(String::new()),
            Ok("PERMIT ZONE 4 ONLY".to_string()),
            Ok(String::new()),
        ]);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes.iter().map(|o| o.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(outcomes[0].verdict.is_none());
        assert!(outcomes[1].verdict.is_some());
        assert!(outcomes[2].verdict.is_none());
    }

    #[test]
    fn test_worker_exits_when_channel_closes() {
        let (job_tx, job_rx) = create_job_channel();
        let (out_tx, _out_rx) = create_outcome_channel();

        let worker = thread::spawn(move || {
            run_recognition_worker(
                job_rx,
                out_tx,
                ScriptedRecognizer::new(Vec::new()),
                ParseOptions::default(),
            );
        });

        drop(job_tx);
        worker.join().expect("Worker thread panicked");
    }
}
