//! Pace estimation.
//!
//! Pace is derived from elapsed time and accumulated distance, gated by the
//! movement state and a per-mode minimum-distance floor. Below the floor the
//! estimate is `None` — rendered upstream as a placeholder, never a
//! divide-by-zero.

use crate::MovementState;

/// Slowest pace considered plausible, in min/km.
pub const MAX_PLAUSIBLE_PACE_MIN_PER_KM: f64 = 120.0;

/// Fastest pace considered plausible, in min/km.
pub const MIN_PLAUSIBLE_PACE_MIN_PER_KM: f64 = 1.0;

/// Smoothed live pace in minutes per kilometer, or `None` when no stable
/// pace exists yet.
///
/// All of the following must hold for a pace to be reported:
/// - the session is classified as moving (a paused/weak session shows no pace)
/// - the accumulated distance reached the per-mode floor
/// - the inputs are finite and positive
///
/// # Example
/// ```
/// use motion_tracker::{pace, MovementState};
///
/// // 0.03 km under a 0.05 km floor: no pace, however long the session ran
/// assert_eq!(pace::estimate(600, 0.03, MovementState::Moving, 0.05), None);
///
/// // Past the floor a finite pace appears
/// let p = pace::estimate(30, 0.05, MovementState::Moving, 0.05).unwrap();
/// assert!((p - 10.0).abs() < 1e-9); // 30s for 50m = 10 min/km
/// ```
pub fn estimate(
    elapsed_seconds: u64,
    distance_km: f64,
    state: MovementState,
    min_distance_km: f64,
) -> Option<f64> {
    if state != MovementState::Moving {
        return None;
    }
    if !distance_km.is_finite() || distance_km <= 0.0 || distance_km < min_distance_km {
        return None;
    }

    let pace = (elapsed_seconds as f64 / 60.0) / distance_km;
    pace.is_finite().then_some(pace)
}

/// Range-validate an externally supplied pace (e.g. derived from the
/// platform's speed field) before trusting it in place of the derived value.
///
/// External sources are distrusted: non-finite or implausible values
/// (outside roughly 1-120 min/km) are discarded.
pub fn validate_external_pace(pace_min_per_km: f64) -> Option<f64> {
    if pace_min_per_km.is_finite()
        && pace_min_per_km >= MIN_PLAUSIBLE_PACE_MIN_PER_KM
        && pace_min_per_km <= MAX_PLAUSIBLE_PACE_MIN_PER_KM
    {
        Some(pace_min_per_km)
    } else {
        None
    }
}

/// Session-average pace for the final summary, in min/km.
///
/// Unlike [`estimate`] this has no state or floor gate: it is computed once
/// at session end from the totals. Returns `None` for a session that covered
/// no distance.
pub fn average_pace_min_per_km(elapsed_seconds: u64, distance_km: f64) -> Option<f64> {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return None;
    }
    let pace = (elapsed_seconds as f64 / 60.0) / distance_km;
    pace.is_finite().then_some(pace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pace_below_mode_floor() {
        // Running floor 0.05 km: 0.03 km gives no pace even after an hour
        assert_eq!(estimate(3600, 0.03, MovementState::Moving, 0.05), None);

        // At the floor the pace becomes finite
        let p = estimate(300, 0.05, MovementState::Moving, 0.05);
        assert!(p.is_some());
        assert!(p.unwrap().is_finite());
    }

    #[test]
    fn test_no_pace_unless_moving() {
        assert_eq!(estimate(300, 1.0, MovementState::Stationary, 0.05), None);
        assert_eq!(estimate(300, 1.0, MovementState::SignalWeak, 0.05), None);
        assert!(estimate(300, 1.0, MovementState::Moving, 0.05).is_some());
    }

    #[test]
    fn test_no_pace_for_zero_or_garbage_distance() {
        assert_eq!(estimate(300, 0.0, MovementState::Moving, 0.0), None);
        assert_eq!(estimate(300, f64::NAN, MovementState::Moving, 0.05), None);
        assert_eq!(estimate(300, -1.0, MovementState::Moving, 0.05), None);
    }

    #[test]
    fn test_pace_arithmetic() {
        // 6 min for 1 km
        let p = estimate(360, 1.0, MovementState::Moving, 0.05).unwrap();
        assert!((p - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_external_pace_validation() {
        assert_eq!(validate_external_pace(5.5), Some(5.5));
        assert_eq!(validate_external_pace(0.5), None); // faster than plausible
        assert_eq!(validate_external_pace(150.0), None); // slower than plausible
        assert_eq!(validate_external_pace(f64::NAN), None);
        assert_eq!(validate_external_pace(f64::INFINITY), None);
    }

    #[test]
    fn test_average_pace_ignores_state_gates() {
        let p = average_pace_min_per_km(600, 2.0).unwrap();
        assert!((p - 5.0).abs() < 1e-9);
        assert_eq!(average_pace_min_per_km(600, 0.0), None);
    }
}
