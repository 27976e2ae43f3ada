//! Movement classification state machine.
//!
//! Consumes filter verdicts and keeps accepted/rejected streak counters so a
//! single noisy fix can never flip the state. Consumer GPS delivers isolated
//! bad (or good) samples constantly; streak confirmation trades a little
//! latency for a stable display state.
//!
//! The one exception is weak signal: it is an instant, unambiguous condition
//! and transitions immediately, resetting both streaks.

use crate::{IngestVerdict, MovementState, RejectionReason, TrackerConfig};

/// Per-session movement classifier. Initial state: stationary.
///
/// This is a plain state object with pure-ish transition methods; it knows
/// nothing about timers, rendering or storage.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    state: MovementState,
    accepted_streak: u32,
    rejected_streak: u32,
    stationary_seconds: u64,
    paused: bool,
}

impl MovementClassifier {
    pub fn new() -> Self {
        Self {
            state: MovementState::Stationary,
            accepted_streak: 0,
            rejected_streak: 0,
            stationary_seconds: 0,
            paused: false,
        }
    }

    /// Rebuild a classifier from recovered snapshot values.
    ///
    /// Streaks are not persisted; they restart at zero, which only delays the
    /// next confirmed transition by a few fixes.
    pub fn from_snapshot(state: MovementState, stationary_seconds: u64) -> Self {
        Self {
            state,
            accepted_streak: 0,
            rejected_streak: 0,
            stationary_seconds,
            paused: state == MovementState::Stationary,
        }
    }

    /// Apply one filter verdict and return the (possibly unchanged) state.
    pub fn observe(&mut self, verdict: &IngestVerdict, config: &TrackerConfig) -> MovementState {
        match verdict.rejection {
            // Weak signal: instant transition, no streak confirmation.
            Some(RejectionReason::WeakSignalAccuracy) => {
                self.accepted_streak = 0;
                self.rejected_streak = 0;
                self.state = MovementState::SignalWeak;
            }
            // Not moving enough: confirm a stop only after a full streak.
            Some(RejectionReason::BelowMinStep) | Some(RejectionReason::BelowMinSpeed) => {
                self.rejected_streak += 1;
                self.accepted_streak = 0;
                if self.rejected_streak >= config.min_rejected_fixes_to_confirm_stop {
                    self.enter_stationary();
                }
            }
            // Accepted: confirm movement only after a full streak.
            None => {
                self.accepted_streak += 1;
                self.rejected_streak = 0;
                if self.accepted_streak >= config.min_accepted_fixes_to_confirm_moving {
                    self.enter_moving();
                }
            }
        }
        self.state
    }

    /// Advance the stationary-time accumulator by one timer tick.
    ///
    /// Driven by the session's 1 Hz timer, not by fix arrival.
    pub fn tick_second(&mut self) {
        if self.state == MovementState::Stationary {
            self.stationary_seconds += 1;
        }
    }

    fn enter_moving(&mut self) {
        if self.state != MovementState::Moving {
            self.stationary_seconds = 0;
            self.paused = false;
        }
        self.state = MovementState::Moving;
    }

    fn enter_stationary(&mut self) {
        if self.state != MovementState::Stationary {
            self.paused = true;
        }
        self.state = MovementState::Stationary;
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    /// Raised when the session transitioned into stationary; consumers use it
    /// to suppress the pace display.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn stationary_seconds(&self) -> u64 {
        self.stationary_seconds
    }
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new()
    }
}
