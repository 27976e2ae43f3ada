//! Point ingestion filter.
//!
//! Validates a raw fix against the session's last accepted anchor using
//! three gates, in order:
//! 1. Accuracy: the fix's accuracy radius must be within the weak-signal
//!    threshold (and finite) to be trusted at all.
//! 2. Step: displacement from the anchor must reach the minimum step.
//! 3. Speed: displacement over elapsed time must reach the minimum speed.
//!
//! The filter is a pure function: it never mutates the anchor. The caller
//! (the session) replaces the anchor when a verdict comes back accepted.

use crate::geo_utils::displacement_meters;
use crate::{IngestVerdict, LocationFix, RejectionReason, TrackerConfig};

/// Evaluate one raw fix against the last accepted anchor.
///
/// The first usable fix of a session (no anchor yet) is accepted
/// unconditionally with a zero delta; it establishes the anchor.
///
/// Non-finite accuracy or coordinates are rejections, never silent accepts:
/// a fix the platform cannot locate is indistinguishable from weak signal.
///
/// # Example
/// ```
/// use motion_tracker::{filter, LocationFix, TrackerConfig};
///
/// let config = TrackerConfig::default();
/// let first = LocationFix::new(51.5074, -0.1278, 8.0, 1_000);
/// let verdict = filter::evaluate(first, None, &config);
/// assert!(verdict.accepted());
/// assert_eq!(verdict.delta_distance_meters, 0.0);
/// ```
pub fn evaluate(
    fix: LocationFix,
    last_anchor: Option<&LocationFix>,
    config: &TrackerConfig,
) -> IngestVerdict {
    // Gate 1: signal quality. Too inaccurate to trust regardless of displacement.
    if !fix.accuracy_meters.is_finite()
        || !fix.is_valid()
        || fix.accuracy_meters > config.weak_signal_accuracy_threshold_meters
    {
        return IngestVerdict {
            rejection: Some(RejectionReason::WeakSignalAccuracy),
            delta_distance_meters: 0.0,
            fix,
        };
    }

    // First usable fix establishes the anchor.
    let anchor = match last_anchor {
        Some(a) => a,
        None => {
            return IngestVerdict {
                rejection: None,
                delta_distance_meters: 0.0,
                fix,
            }
        }
    };

    let displacement = match displacement_meters(anchor, &fix) {
        Some(d) => d,
        // Unreachable with an anchor that itself passed the filter, but a
        // non-finite displacement must never be accepted as zero.
        None => {
            return IngestVerdict {
                rejection: Some(RejectionReason::WeakSignalAccuracy),
                delta_distance_meters: 0.0,
                fix,
            }
        }
    };

    // Gate 2: minimum step.
    if displacement < config.min_step_meters {
        return IngestVerdict {
            rejection: Some(RejectionReason::BelowMinStep),
            delta_distance_meters: displacement,
            fix,
        };
    }

    // Gate 3: minimum speed. A non-positive elapsed time makes the speed
    // undefined, which is a rejection, not an accept.
    let elapsed_seconds = (fix.timestamp_ms - anchor.timestamp_ms) as f64 / 1000.0;
    if !elapsed_seconds.is_finite()
        || elapsed_seconds <= 0.0
        || displacement / elapsed_seconds < config.min_speed_meters_per_second
    {
        return IngestVerdict {
            rejection: Some(RejectionReason::BelowMinSpeed),
            delta_distance_meters: displacement,
            fix,
        };
    }

    IngestVerdict {
        rejection: None,
        delta_distance_meters: displacement,
        fix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActivityMode;

    fn config() -> TrackerConfig {
        TrackerConfig::for_mode(ActivityMode::Running)
    }

    // ~0.0001 deg latitude is ~11.1m
    fn fix_at(lat_offset_deg: f64, accuracy: f64, ts_ms: i64) -> LocationFix {
        LocationFix::new(51.5 + lat_offset_deg, -0.12, accuracy, ts_ms)
    }

    #[test]
    fn test_weak_accuracy_rejected() {
        let anchor = fix_at(0.0, 8.0, 0);
        let fix = fix_at(0.001, 100.0, 5_000); // far enough, but 100m accuracy
        let verdict = evaluate(fix, Some(&anchor), &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::WeakSignalAccuracy));
        assert_eq!(verdict.delta_distance_meters, 0.0);
    }

    #[test]
    fn test_non_finite_accuracy_rejected() {
        let verdict = evaluate(fix_at(0.0, f64::NAN, 0), None, &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::WeakSignalAccuracy));

        let verdict = evaluate(fix_at(0.0, f64::INFINITY, 0), None, &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::WeakSignalAccuracy));
    }

    #[test]
    fn test_invalid_coordinates_rejected_even_without_anchor() {
        let bad = LocationFix::new(f64::NAN, -0.12, 8.0, 0);
        let verdict = evaluate(bad, None, &config());
        assert!(!verdict.accepted());
    }

    #[test]
    fn test_first_fix_accepted_with_zero_delta() {
        let verdict = evaluate(fix_at(0.0, 8.0, 0), None, &config());
        assert!(verdict.accepted());
        assert_eq!(verdict.delta_distance_meters, 0.0);
    }

    #[test]
    fn test_below_min_step_rejected() {
        let anchor = fix_at(0.0, 8.0, 0);
        let fix = fix_at(0.00001, 8.0, 2_000); // ~1.1m < 2.5m
        let verdict = evaluate(fix, Some(&anchor), &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::BelowMinStep));
        assert!(verdict.delta_distance_meters > 0.0);
    }

    #[test]
    fn test_below_min_speed_rejected() {
        let anchor = fix_at(0.0, 8.0, 0);
        // ~11m in 30s = 0.37 m/s < 1.0 m/s
        let fix = fix_at(0.0001, 8.0, 30_000);
        let verdict = evaluate(fix, Some(&anchor), &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::BelowMinSpeed));
    }

    #[test]
    fn test_zero_elapsed_rejected_not_accepted() {
        let anchor = fix_at(0.0, 8.0, 5_000);
        // Same timestamp: speed is undefined, must not silently accept
        let fix = fix_at(0.0001, 8.0, 5_000);
        let verdict = evaluate(fix, Some(&anchor), &config());
        assert_eq!(verdict.rejection, Some(RejectionReason::BelowMinSpeed));
    }

    #[test]
    fn test_good_fix_accepted_with_displacement() {
        let anchor = fix_at(0.0, 8.0, 0);
        // ~11m in 5s = 2.2 m/s
        let fix = fix_at(0.0001, 8.0, 5_000);
        let verdict = evaluate(fix, Some(&anchor), &config());
        assert!(verdict.accepted());
        assert!((verdict.delta_distance_meters - 11.1).abs() < 0.5);
    }

    #[test]
    fn test_filter_is_pure() {
        let anchor = fix_at(0.0, 8.0, 0);
        let fix = fix_at(0.0001, 8.0, 5_000);
        let v1 = evaluate(fix, Some(&anchor), &config());
        let v2 = evaluate(fix, Some(&anchor), &config());
        assert_eq!(v1, v2);
    }
}
