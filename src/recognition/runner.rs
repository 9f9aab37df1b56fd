//! Recognition loop runner.
//!
//! The coordinator owns the session and is the only thread that touches it.
//! Slow work (OCR, parse, decide) runs on the worker thread; results come
//! back over the outcome channel and are applied here, serialized. Ticks are
//! realized by waiting on that channel with a timeout, so an outcome is
//! never processed concurrently with a tick.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::capture::CaptureSource;
use crate::config::RecognitionConfig;
use crate::ocr::TextRecognizer;
use crate::recognition::queue::{
    create_job_channel, create_outcome_channel, AttemptOutcome, RecognitionJob,
};
use crate::recognition::session::{AttemptDisposition, RecognitionSession};
use crate::recognition::worker::run_recognition_worker;
use crate::sign::{ParkVerdict, ParseOptions};

/// Cancellation handle shared with whoever can turn recognition off.
///
/// Disabling is effective immediately for scheduling; an attempt already in
/// flight finishes on the worker and its result is dropped as stale.
#[derive(Clone)]
pub struct LoopHandle {
    enabled: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Default for LoopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was captured and handed to the worker
    Dispatched,
    /// An attempt was already in flight; the tick was a no-op
    Skipped,
    /// No frame was available; retry on the next tick
    NoFrame,
}

/// Single-threaded coordinator core.
///
/// Kept free of threads and timing so the loop invariants are directly
/// testable; the blocking runner below drives it.
pub struct Coordinator<S: CaptureSource> {
    session: RecognitionSession,
    source: S,
    jobs: Sender<RecognitionJob>,
    attempts_started: u32,
}

impl<S: CaptureSource> Coordinator<S> {
    pub fn new(source: S, jobs: Sender<RecognitionJob>) -> Self {
        let mut session = RecognitionSession::new();
        session.enable();
        Self {
            session,
            source,
            jobs,
            attempts_started: 0,
        }
    }

    pub fn attempts_started(&self) -> u32 {
        self.attempts_started
    }

    pub fn has_in_flight(&self) -> bool {
        self.session.has_in_flight()
    }

    pub fn disable(&mut self) {
        self.session.disable();
    }

    /// One scheduled recognition attempt. No-op while a previous attempt is
    /// still outstanding, so concurrent OCR work stays bounded at one.
    pub fn on_tick(&mut self) -> Result<TickOutcome> {
        let Some(attempt) = self.session.begin_attempt() else {
            debug!("Tick skipped: attempt already in flight");
            return Ok(TickOutcome::Skipped);
        };
        self.attempts_started += 1;

        match self.source.capture() {
            Ok(Some(image)) => {
                self.jobs
                    .send(RecognitionJob::new(attempt, image))
                    .map_err(|_| anyhow!("recognition worker is gone"))?;
                self.session.frame_dispatched();
                Ok(TickOutcome::Dispatched)
            }
            Ok(None) => {
                debug!("Attempt {}: no frame available", attempt);
                self.session.capture_failed();
                Ok(TickOutcome::NoFrame)
            }
            Err(e) => {
                debug!("Attempt {}: capture failed: {}", attempt, e);
                self.session.capture_failed();
                Ok(TickOutcome::NoFrame)
            }
        }
    }

    /// Applies a worker outcome. Stale results (disabled session or
    /// superseded attempt) are dropped without effect. Returns the verdict
    /// when the attempt was confident; the activation is then resolved.
    pub fn on_outcome(&mut self, outcome: AttemptOutcome) -> Option<ParkVerdict> {
        if self.session.accept_outcome(outcome.attempt) == AttemptDisposition::Stale {
            debug!("Attempt {}: stale result dropped", outcome.attempt);
            return None;
        }

        match outcome.verdict {
            Some(verdict) => {
                self.session.resolve();
                Some(verdict)
            }
            None => {
                self.session.rearm();
                None
            }
        }
    }
}

/// Runs the capture/recognize loop until a confident verdict is produced,
/// the handle is disabled, or the configured attempt budget runs out.
///
/// `on_verdict` fires exactly once, and only for a successful activation.
/// The verdict is also returned for callers that prefer a value.
pub fn run_recognition_loop<S, R, F>(
    source: S,
    recognizer: R,
    config: &RecognitionConfig,
    handle: &LoopHandle,
    mut on_verdict: F,
) -> Result<Option<ParkVerdict>>
where
    S: CaptureSource,
    R: TextRecognizer + Send + 'static,
    F: FnMut(ParkVerdict),
{
    let interval = Duration::from_millis(config.retry_interval_ms);
    let opts = ParseOptions {
        time_format: config.time_format,
    };

    let (job_tx, job_rx) = create_job_channel();
    let (outcome_tx, outcome_rx) = create_outcome_channel();

    let worker = thread::spawn(move || {
        run_recognition_worker(job_rx, outcome_tx, recognizer, opts);
    });

    let mut coordinator = Coordinator::new(source, job_tx);
    let mut resolved = None;

    // Enabling triggers an immediate first attempt; the interval paces the
    // retries after that.
    if handle.is_enabled() {
        coordinator.on_tick()?;
    }

    while handle.is_enabled() && resolved.is_none() {
        match outcome_rx.recv_timeout(interval) {
            Ok(outcome) => {
                // Re-check the flag at the moment of application: a result
                // that raced a disable must not surface.
                if !handle.is_enabled() {
                    coordinator.disable();
                    break;
                }
                if let Some(verdict) = coordinator.on_outcome(outcome) {
                    info!("Verdict: {}", verdict);
                    on_verdict(verdict.clone());
                    resolved = Some(verdict);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                coordinator.on_tick()?;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("recognition worker terminated unexpectedly"));
            }
        }

        if let Some(max) = config.max_attempts {
            if resolved.is_none()
                && coordinator.attempts_started() >= max
                && !coordinator.has_in_flight()
            {
                info!("No confident verdict after {} attempt(s)", max);
                break;
            }
        }
    }

    // Dropping the coordinator closes the job channel and lets the worker
    // drain and exit.
    drop(coordinator);
    if worker.join().is_err() {
        warn!("Recognition worker thread panicked");
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::RestrictionRule;
    use std::sync::Mutex;

    /// Capture source that always serves the same frame.
    struct FixedSource;

    impl CaptureSource for FixedSource {
        fn capture(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(Some(b"frame".to_vec()))
        }
    }

    fn cant_park() -> ParkVerdict {
        let rule = RestrictionRule::PermitOnly { zone: "4".into() };
        ParkVerdict::CantPark {
            reason: rule.clone(),
            matched_rule: rule,
        }
    }

    #[test]
    fn test_tick_dispatches_one_job() {
        let (job_tx, job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(FixedSource, job_tx);

        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Dispatched);
        let job = job_rx.try_recv().unwrap();
        assert_eq!(job.image, b"frame");
    }

    #[test]
    fn test_at_most_one_in_flight() {
        let (job_tx, job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(FixedSource, job_tx);

        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Dispatched);
        // Ticks firing while the attempt is outstanding issue no captures.
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Skipped);

        assert_eq!(job_rx.try_iter().count(), 1);
    }

    #[test]
    fn test_non_confident_outcome_rearms() {
        let (job_tx, job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(FixedSource, job_tx);

        coordinator.on_tick().unwrap();
        let attempt = job_rx.try_recv().unwrap().attempt;
        let verdict = coordinator.on_outcome(AttemptOutcome {
            attempt,
            verdict: None,
        });
        assert!(verdict.is_none());

        // The next tick may start a fresh attempt.
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Dispatched);
    }

    #[test]
    fn test_confident_outcome_resolves() {
        let (job_tx, job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(FixedSource, job_tx);

        coordinator.on_tick().unwrap();
        let attempt = job_rx.try_recv().unwrap().attempt;
        let verdict = coordinator.on_outcome(AttemptOutcome {
            attempt,
            verdict: Some(cant_park()),
        });
        assert_eq!(verdict, Some(cant_park()));

        // Resolved is terminal: no further captures.
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(job_rx.try_iter().count(), 0);
    }

    #[test]
    fn test_stale_outcome_after_disable_is_dropped() {
        let (job_tx, job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(FixedSource, job_tx);

        coordinator.on_tick().unwrap();
        let attempt = job_rx.try_recv().unwrap().attempt;

        coordinator.disable();
        let verdict = coordinator.on_outcome(AttemptOutcome {
            attempt,
            verdict: Some(cant_park()),
        });
        assert!(verdict.is_none(), "stale result must not produce a verdict");
    }

    #[test]
    fn test_no_frame_counts_as_attempt() {
        struct EmptySource;
        impl CaptureSource for EmptySource {
            fn capture(&mut self) -> Result<Option<Vec<u8>>> {
                Ok(None)
            }
        }

        let (job_tx, _job_rx) = create_job_channel();
        let mut coordinator = Coordinator::new(EmptySource, job_tx);
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::NoFrame);
        assert_eq!(coordinator.attempts_started(), 1);
        // And the session re-armed, so the next tick tries again.
        assert_eq!(coordinator.on_tick().unwrap(), TickOutcome::NoFrame);
        assert_eq!(coordinator.attempts_started(), 2);
    }

    /// Recognizer that fails a few times, then reads a decisive sign.
    struct EventuallyConfident {
        failures_left: Mutex<u32>,
    }

    impl TextRecognizer for EventuallyConfident {
        fn recognize(&self, _image: &[u8]) -> Result<String> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                Ok(String::new())
            } else {
                Ok("PERMIT ZONE 4 ONLY".to_string())
            }
        }
    }

    fn fast_config(max_attempts: Option<u32>) -> RecognitionConfig {
        RecognitionConfig {
            retry_interval_ms: 5,
            max_attempts,
            ..RecognitionConfig::default()
        }
    }

    #[test]
    fn test_loop_resolves_on_later_attempt() {
        let recognizer = EventuallyConfident {
            failures_left: Mutex::new(2),
        };
        let handle = LoopHandle::new();
        let mut surfaced = Vec::new();

        let verdict = run_recognition_loop(
            FixedSource,
            recognizer,
            &fast_config(None),
            &handle,
            |v| surfaced.push(v),
        )
        .unwrap();

        let verdict = verdict.expect("loop should resolve");
        assert!(matches!(verdict, ParkVerdict::CantPark { .. }));
        // Surfaced exactly once, and identical to the returned verdict.
        assert_eq!(surfaced.len(), 1);
        assert_eq!(surfaced[0], verdict);
    }

    #[test]
    fn test_loop_gives_up_after_attempt_budget() {
        struct NeverConfident;
        impl TextRecognizer for NeverConfident {
            fn recognize(&self, _image: &[u8]) -> Result<String> {
                Ok("XYZ GARBLED TEXT".to_string())
            }
        }

        let handle = LoopHandle::new();
        let mut surfaced = Vec::new();

        let verdict = run_recognition_loop(
            FixedSource,
            NeverConfident,
            &fast_config(Some(3)),
            &handle,
            |v| surfaced.push(v),
        )
        .unwrap();

        assert!(verdict.is_none());
        assert!(surfaced.is_empty(), "no verdict may surface without confidence");
    }

    #[test]
    fn test_disabled_handle_never_captures() {
        struct PanickingSource;
        impl CaptureSource for PanickingSource {
            fn capture(&mut self) -> Result<Option<Vec<u8>>> {
                panic!("capture must not be called when disabled");
            }
        }
        struct NoopRecognizer;
        impl TextRecognizer for NoopRecognizer {
            fn recognize(&self, _image: &[u8]) -> Result<String> {
                Ok(String::new())
            }
        }

        let handle = LoopHandle::new();
        handle.disable();

        let verdict = run_recognition_loop(
            PanickingSource,
            NoopRecognizer,
            &fast_config(None),
            &handle,
            |_| panic!("no verdict expected"),
        )
        .unwrap();
        assert!(verdict.is_none());
    }
}
