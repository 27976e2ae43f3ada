//! Vital-sign estimation (heart rate, calories).
//!
//! The tracking core treats vitals as a pluggable estimator behind a trait.
//! The shipped implementation is an explicit placeholder that simulates a
//! plausible heart rate and calorie burn; a real sensor integration can be
//! substituted without touching the tracking core.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{ActivityMode, MovementState};

/// One vitals reading, produced once per timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct VitalsSample {
    pub heart_rate_bpm: u16,
    pub calories_kcal: f64,
}

/// Source of vitals readings for a session.
///
/// Implementations must be cheap: `tick` runs on the 1 Hz session timer.
pub trait VitalsEstimator: Send {
    /// Advance by one second of session time and return the current reading.
    fn tick(&mut self, state: MovementState) -> VitalsSample;

    /// Advance by `seconds` of unobserved time (session recovery catch-up).
    ///
    /// Only time-derived values (calories) are extrapolated; there is no
    /// pretending to know what the heart did while the tracker was asleep.
    fn fast_forward(&mut self, seconds: u64) -> VitalsSample;

    /// Latest reading without advancing time.
    fn current(&self) -> VitalsSample;
}

/// Simulated vitals: a bounded random walk around a per-mode heart-rate
/// baseline plus a constant-rate calorie burn.
///
/// Placeholder behavior by contract — deterministic under [`with_seed`] so
/// tests can assert exact values.
///
/// [`with_seed`]: SimulatedVitals::with_seed
pub struct SimulatedVitals {
    rng: StdRng,
    mode: ActivityMode,
    heart_rate_bpm: u16,
    calories_kcal: f64,
}

impl SimulatedVitals {
    const MIN_HR: u16 = 60;
    const MAX_HR: u16 = 195;

    pub fn new(mode: ActivityMode) -> Self {
        Self::from_parts(mode, StdRng::from_entropy(), baseline_hr(mode), 0.0)
    }

    /// Deterministic variant for tests.
    pub fn with_seed(mode: ActivityMode, seed: u64) -> Self {
        Self::from_parts(mode, StdRng::seed_from_u64(seed), baseline_hr(mode), 0.0)
    }

    /// Resume from recovered snapshot values.
    pub fn from_snapshot(mode: ActivityMode, heart_rate_bpm: u16, calories_kcal: f64) -> Self {
        let hr = if heart_rate_bpm == 0 {
            baseline_hr(mode)
        } else {
            heart_rate_bpm.clamp(Self::MIN_HR, Self::MAX_HR)
        };
        let kcal = if calories_kcal.is_finite() && calories_kcal >= 0.0 {
            calories_kcal
        } else {
            0.0
        };
        Self::from_parts(mode, StdRng::from_entropy(), hr, kcal)
    }

    fn from_parts(mode: ActivityMode, rng: StdRng, heart_rate_bpm: u16, calories_kcal: f64) -> Self {
        Self {
            rng,
            mode,
            heart_rate_bpm,
            calories_kcal,
        }
    }
}

impl VitalsEstimator for SimulatedVitals {
    fn tick(&mut self, state: MovementState) -> VitalsSample {
        let active = state == MovementState::Moving;
        let target = if active {
            baseline_hr(self.mode)
        } else {
            // Drift toward a recovery heart rate while not moving
            90
        };

        // Random walk with a pull toward the target
        let jitter: i32 = self.rng.gen_range(-2..=2);
        let pull = ((target as i32 - self.heart_rate_bpm as i32).signum()) * self.rng.gen_range(0..=2);
        let next = (self.heart_rate_bpm as i32 + jitter + pull)
            .clamp(Self::MIN_HR as i32, Self::MAX_HR as i32);
        self.heart_rate_bpm = next as u16;

        self.calories_kcal += if active {
            active_kcal_per_second(self.mode)
        } else {
            REST_KCAL_PER_SECOND
        };

        self.current()
    }

    fn fast_forward(&mut self, seconds: u64) -> VitalsSample {
        // Calories are the only time-derived value; heart rate stays put.
        self.calories_kcal += seconds as f64 * active_kcal_per_second(self.mode);
        self.current()
    }

    fn current(&self) -> VitalsSample {
        VitalsSample {
            heart_rate_bpm: self.heart_rate_bpm,
            calories_kcal: self.calories_kcal,
        }
    }
}

/// Typical working heart rate per mode, in bpm.
fn baseline_hr(mode: ActivityMode) -> u16 {
    match mode {
        ActivityMode::Running => 150,
        ActivityMode::Walking => 110,
        ActivityMode::Cycling => 140,
        ActivityMode::Indoor => 125,
    }
}

/// Active calorie burn per mode, in kcal per second.
fn active_kcal_per_second(mode: ActivityMode) -> f64 {
    match mode {
        ActivityMode::Running => 0.18,
        ActivityMode::Walking => 0.07,
        ActivityMode::Cycling => 0.14,
        ActivityMode::Indoor => 0.10,
    }
}

const REST_KCAL_PER_SECOND: f64 = 0.02;
