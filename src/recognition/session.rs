//! Per-activation recognition session state.
//!
//! The session is owned exclusively by the loop coordinator; no other
//! component mutates it. It tracks the state machine position, whether
//! recognition is enabled, and the id of the one attempt allowed in flight,
//! so results from superseded or cancelled attempts can be recognized as
//! stale and dropped.

use std::fmt;
use std::time::Instant;

/// Recognition loop states. `Resolved` is terminal for an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    /// Not active
    Idle,
    /// Enabled, waiting for the next tick
    Armed,
    /// Frame request in flight
    Capturing,
    /// OCR/parse/decide in flight
    Recognizing,
    /// Verdict produced and surfaced
    Resolved,
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionState::Idle => write!(f, "Idle"),
            RecognitionState::Armed => write!(f, "Armed"),
            RecognitionState::Capturing => write!(f, "Capturing"),
            RecognitionState::Recognizing => write!(f, "Recognizing"),
            RecognitionState::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Whether an attempt's result may still be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDisposition {
    Fresh,
    Stale,
}

pub struct RecognitionSession {
    state: RecognitionState,
    enabled: bool,
    in_flight: Option<u64>,
    next_attempt: u64,
    last_attempt_at: Option<Instant>,
}

impl RecognitionSession {
    pub fn new() -> Self {
        Self {
            state: RecognitionState::Idle,
            enabled: false,
            in_flight: None,
            next_attempt: 1,
            last_attempt_at: None,
        }
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_attempt_at(&self) -> Option<Instant> {
        self.last_attempt_at
    }

    /// Arms the session. Only meaningful from `Idle`.
    pub fn enable(&mut self) {
        if self.state == RecognitionState::Idle {
            self.enabled = true;
            self.state = RecognitionState::Armed;
        }
    }

    /// Disables recognition. Scheduling stops immediately; an in-flight
    /// attempt keeps its id so its late result is classified stale.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.state = RecognitionState::Idle;
    }

    /// Starts a new attempt if one is allowed: the session must be armed and
    /// nothing already in flight. Returns the attempt id, or None for a
    /// no-op tick.
    pub fn begin_attempt(&mut self) -> Option<u64> {
        if !self.enabled || self.state != RecognitionState::Armed || self.in_flight.is_some() {
            return None;
        }
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.in_flight = Some(attempt);
        self.last_attempt_at = Some(Instant::now());
        self.state = RecognitionState::Capturing;
        Some(attempt)
    }

    /// The frame was handed to the recognition worker.
    pub fn frame_dispatched(&mut self) {
        if self.state == RecognitionState::Capturing {
            self.state = RecognitionState::Recognizing;
        }
    }

    /// No frame was available; the attempt ends and the session re-arms.
    pub fn capture_failed(&mut self) {
        if self.state == RecognitionState::Capturing {
            self.in_flight = None;
            self.state = RecognitionState::Armed;
        }
    }

    /// Classifies an arriving result. Checked at the moment the result is
    /// about to be applied: a result is fresh only if recognition is still
    /// enabled and the attempt is the one currently in flight.
    pub fn accept_outcome(&mut self, attempt: u64) -> AttemptDisposition {
        if self.enabled && self.in_flight == Some(attempt) {
            self.in_flight = None;
            AttemptDisposition::Fresh
        } else {
            AttemptDisposition::Stale
        }
    }

    /// A confident verdict was produced; the activation is over.
    pub fn resolve(&mut self) {
        self.enabled = false;
        self.state = RecognitionState::Resolved;
    }

    /// The attempt was not confident; wait for the next tick.
    pub fn rearm(&mut self) {
        if self.enabled {
            self.state = RecognitionState::Armed;
        }
    }
}

impl Default for RecognitionSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_session() -> RecognitionSession {
        let mut session = RecognitionSession::new();
        session.enable();
        session
    }

    #[test]
    fn test_enable_arms_from_idle() {
        let mut session = RecognitionSession::new();
        assert_eq!(session.state(), RecognitionState::Idle);
        session.enable();
        assert_eq!(session.state(), RecognitionState::Armed);
        assert!(session.is_enabled());
    }

    #[test]
    fn test_attempt_lifecycle() {
        let mut session = armed_session();
        assert!(session.last_attempt_at().is_none());

        let attempt = session.begin_attempt().unwrap();
        assert_eq!(session.state(), RecognitionState::Capturing);
        assert!(session.last_attempt_at().is_some());

        session.frame_dispatched();
        assert_eq!(session.state(), RecognitionState::Recognizing);

        assert_eq!(session.accept_outcome(attempt), AttemptDisposition::Fresh);
        session.rearm();
        assert_eq!(session.state(), RecognitionState::Armed);
    }

    #[test]
    fn test_at_most_one_in_flight() {
        let mut session = armed_session();
        let first = session.begin_attempt();
        assert!(first.is_some());
        // A tick firing while the attempt is outstanding is a no-op.
        assert!(session.begin_attempt().is_none());
        session.frame_dispatched();
        assert!(session.begin_attempt().is_none());
    }

    #[test]
    fn test_attempt_ids_are_unique() {
        let mut session = armed_session();
        let first = session.begin_attempt().unwrap();
        session.accept_outcome(first);
        session.rearm();
        let second = session.begin_attempt().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_capture_failure_rearms() {
        let mut session = armed_session();
        session.begin_attempt().unwrap();
        session.capture_failed();
        assert_eq!(session.state(), RecognitionState::Armed);
        assert!(!session.has_in_flight());
        assert!(session.begin_attempt().is_some());
    }

    #[test]
    fn test_outcome_after_disable_is_stale() {
        let mut session = armed_session();
        let attempt = session.begin_attempt().unwrap();
        session.frame_dispatched();

        session.disable();
        assert_eq!(session.accept_outcome(attempt), AttemptDisposition::Stale);
    }

    #[test]
    fn test_outcome_for_superseded_attempt_is_stale() {
        let mut session = armed_session();
        let first = session.begin_attempt().unwrap();
        session.capture_failed();
        let second = session.begin_attempt().unwrap();

        assert_eq!(session.accept_outcome(first), AttemptDisposition::Stale);
        // The live attempt is unaffected by the stale delivery.
        assert_eq!(session.accept_outcome(second), AttemptDisposition::Fresh);
    }

    #[test]
    fn test_resolve_ends_activation() {
        let mut session = armed_session();
        let attempt = session.begin_attempt().unwrap();
        session.frame_dispatched();
        session.accept_outcome(attempt);
        session.resolve();

        assert_eq!(session.state(), RecognitionState::Resolved);
        assert!(!session.is_enabled());
        assert!(session.begin_attempt().is_none());
    }

    #[test]
    fn test_disable_blocks_new_attempts() {
        let mut session = armed_session();
        session.disable();
        assert!(session.begin_attempt().is_none());
        assert_eq!(session.state(), RecognitionState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", RecognitionState::Armed), "Armed");
        assert_eq!(format!("{}", RecognitionState::Resolved), "Resolved");
    }
}
