//! Distance accumulation.
//!
//! An independent physical rule engine: distance accrues from accuracy and
//! displacement/time deltas alone, deliberately decoupled from the movement
//! classifier. Coupling distance to a debounced classification would make
//! the distance metric lag or skip real displacement.
//!
//! A fix with poor accuracy can never contribute distance, but it also never
//! resets the anchor: it is simply skipped, so a transient bad fix does not
//! create a false restart.

use crate::geo_utils::displacement_meters;
use crate::LocationFix;

/// Minimum displacement between anchors for an accrual, in meters.
pub const MIN_ACCRUAL_STEP_METERS: f64 = 2.0;

/// Minimum wall-clock gap since the previous fix for an accrual, in seconds.
pub const MIN_ACCRUAL_INTERVAL_SECONDS: f64 = 1.0;

/// Per-session distance accumulator.
///
/// Owns the distance anchor exclusively: the last fix whose own accuracy was
/// within the anchor bound. The anchor is replaced, never mutated.
#[derive(Debug, Clone)]
pub struct DistanceAccumulator {
    anchor_accuracy_bound_meters: f64,
    prev_anchor: Option<LocationFix>,
    last_fix_at_ms: Option<i64>,
    total_km: f64,
}

impl DistanceAccumulator {
    /// Create an accumulator with the given anchor accuracy bound
    /// (50 m in every mode preset).
    pub fn new(anchor_accuracy_bound_meters: f64) -> Self {
        Self {
            anchor_accuracy_bound_meters,
            prev_anchor: None,
            last_fix_at_ms: None,
            total_km: 0.0,
        }
    }

    /// Rebuild an accumulator from a recovered snapshot total.
    ///
    /// The anchor is intentionally not restored: no fixes were observed
    /// during the gap, so the next usable fix re-establishes it without
    /// fabricating distance.
    pub fn from_snapshot(anchor_accuracy_bound_meters: f64, total_km: f64) -> Self {
        Self {
            anchor_accuracy_bound_meters,
            prev_anchor: None,
            last_fix_at_ms: None,
            total_km: if total_km.is_finite() && total_km >= 0.0 {
                total_km
            } else {
                0.0
            },
        }
    }

    /// Feed one raw fix; returns the distance accrued by this call in km
    /// (0.0 when any accrual condition fails).
    ///
    /// Called on every raw fix, independently of the classifier's verdict.
    pub fn accumulate(&mut self, fix: &LocationFix) -> f64 {
        let accuracy_ok =
            fix.accuracy_meters.is_finite() && fix.accuracy_meters <= self.anchor_accuracy_bound_meters;

        let delta_meters = self
            .prev_anchor
            .as_ref()
            .and_then(|anchor| displacement_meters(anchor, fix));

        // Wall-clock gap since the previous fix of any accuracy.
        let delta_seconds = self
            .last_fix_at_ms
            .map(|t| (fix.timestamp_ms - t) as f64 / 1000.0);

        let anchor_ok = self
            .prev_anchor
            .as_ref()
            .map(|a| a.accuracy_meters.is_finite() && a.accuracy_meters <= self.anchor_accuracy_bound_meters)
            .unwrap_or(false);

        let mut accrued_km = 0.0;
        if accuracy_ok && anchor_ok {
            if let (Some(dm), Some(dt)) = (delta_meters, delta_seconds) {
                if dm.is_finite()
                    && dm >= MIN_ACCRUAL_STEP_METERS
                    && dt.is_finite()
                    && dt >= MIN_ACCRUAL_INTERVAL_SECONDS
                {
                    accrued_km = dm / 1000.0;
                    self.total_km += accrued_km;
                }
            }
        }

        // Every fix advances the clock; only a sufficiently accurate one
        // becomes the new anchor.
        self.last_fix_at_ms = Some(fix.timestamp_ms);
        if accuracy_ok && fix.is_valid() {
            self.prev_anchor = Some(*fix);
        }

        accrued_km
    }

    /// Total accumulated distance in km. Non-decreasing for the session.
    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    /// Discard anchors at session teardown so a stale anchor from a previous
    /// workout cannot leak into a new one.
    pub fn reset(&mut self) {
        self.prev_anchor = None;
        self.last_fix_at_ms = None;
    }
}
