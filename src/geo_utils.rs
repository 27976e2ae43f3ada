//! Geographic utilities: great-circle distance and track length.
//!
//! All distances are in meters. Haversine is accurate to well under a
//! centimeter at the displacements this tracker cares about (single GPS
//! steps), which is sufficient for the filter and accumulator gates.

use geo::{Distance, Haversine, Point};

use crate::LocationFix;

/// Great-circle distance between two fixes in meters.
///
/// # Example
/// ```
/// use motion_tracker::LocationFix;
/// use motion_tracker::geo_utils::haversine_distance;
///
/// let london = LocationFix::new(51.5074, -0.1278, 5.0, 0);
/// let paris = LocationFix::new(48.8566, 2.3522, 5.0, 0);
/// let d = haversine_distance(&london, &paris);
/// assert!((d / 1000.0 - 344.0).abs() < 2.0); // ~344 km
/// ```
pub fn haversine_distance(a: &LocationFix, b: &LocationFix) -> f64 {
    Haversine::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Displacement between two fixes, or `None` when either fix has invalid
/// coordinates or the result is not finite.
///
/// The filter and accumulator treat `None` as a rejection, never as zero.
pub fn displacement_meters(a: &LocationFix, b: &LocationFix) -> Option<f64> {
    if !a.is_valid() || !b.is_valid() {
        return None;
    }
    let d = haversine_distance(a, b);
    d.is_finite().then_some(d)
}

/// Total length of a recorded track in meters.
///
/// Invalid fixes contribute nothing (their segments are skipped).
pub fn polyline_length_meters(fixes: &[LocationFix]) -> f64 {
    fixes
        .windows(2)
        .filter_map(|w| displacement_meters(&w[0], &w[1]))
        .sum()
}
