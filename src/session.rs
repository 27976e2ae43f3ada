//! # Tracking Session
//!
//! Stateful engine for one workout session. Owns the filter anchor, the
//! movement classifier, the distance accumulator and the vitals estimator,
//! and exposes two event handlers:
//!
//! - `ingest_fix` for location fixes, arriving at the platform's cadence
//! - `tick` for the independent 1 Hz elapsed-time timer
//!
//! The two are not synchronized; every component operates on latest-known
//! values only, so a fix and a tick may interleave arbitrarily. No handler
//! blocks: fix processing is synchronous arithmetic with no I/O.
//!
//! The session is an explicit state object, independent of any rendering
//! lifecycle, so it can be unit-tested without simulating a UI tree.

use std::sync::Mutex;

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::classifier::MovementClassifier;
use crate::distance::DistanceAccumulator;
use crate::geo_utils::polyline_length_meters;
use crate::snapshot::{ActivitySnapshot, MAX_RAW_FIX_LOG};
use crate::vitals::{SimulatedVitals, VitalsEstimator, VitalsSample};
use crate::{
    filter, pace, Bounds, LocationFix, MovementState, SessionStatus, TrackerConfig,
};

// ============================================================================
// Output Types
// ============================================================================

/// Live tuple consumed by the display layer every tick.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LiveStats {
    pub movement_state: MovementState,
    pub distance_km: f64,
    /// `None` until a stable pace exists (below the mode floor, not moving,
    /// or GPS unavailable). Rendered as a placeholder upstream.
    pub pace_min_per_km: Option<f64>,
    pub elapsed_seconds: u64,
    pub stationary_seconds: u64,
    /// Raised on the transition into stationary, to suppress the pace display.
    pub paused: bool,
    pub heart_rate_bpm: u16,
    pub calories_kcal: f64,
    pub gps_available: bool,
}

/// GPS portion of the final payload, present only for GPS-backed modes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsTrackSummary {
    pub distance_km: f64,
    pub pace_avg_min_per_km: Option<f64>,
    pub route: Vec<LocationFix>,
    /// Polyline length of the recorded route in meters; differs from
    /// `distance_km` because the accumulator filters what it accrues.
    pub route_length_meters: f64,
    pub bounds: Option<Bounds>,
}

/// Final payload handed to the surrounding persistence layer at session end.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub elapsed_seconds: u64,
    pub calories_kcal: f64,
    /// `None` when the session's mode does not use GPS.
    pub gps: Option<GpsTrackSummary>,
}

// ============================================================================
// Tracking Session
// ============================================================================

/// One active workout session.
pub struct TrackingSession {
    user_id: String,
    session_id: String,
    config: TrackerConfig,
    status: SessionStatus,

    classifier: MovementClassifier,
    accumulator: DistanceAccumulator,
    /// Last accepted fix, reference point for the filter's next verdict.
    filter_anchor: Option<LocationFix>,

    /// Bounded raw fix log; doubles as the final route payload.
    raw_fix_log: Vec<LocationFix>,

    elapsed_seconds: u64,
    last_tick_at_ms: i64,

    vitals: Box<dyn VitalsEstimator>,
    /// Cleared when the platform denies location permission mid-session.
    gps_available: bool,
}

impl TrackingSession {
    /// Start a fresh session. All anchors and counters start clean; nothing
    /// is ever reused from a previous workout.
    pub fn start(user_id: &str, session_id: &str, config: TrackerConfig, now_ms: i64) -> Self {
        info!(
            "[MotionTracker] Session {} started (mode {:?})",
            session_id, config.mode
        );
        let mode = config.mode;
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            status: SessionStatus::Running,
            classifier: MovementClassifier::new(),
            accumulator: DistanceAccumulator::new(config.anchor_accuracy_bound_meters),
            filter_anchor: None,
            raw_fix_log: Vec::new(),
            elapsed_seconds: 0,
            last_tick_at_ms: now_ms,
            vitals: Box::new(SimulatedVitals::new(mode)),
            gps_available: mode.uses_gps(),
            config,
        }
    }

    /// Replace the vitals estimator (e.g. a sensor-backed implementation).
    pub fn with_vitals(mut self, vitals: Box<dyn VitalsEstimator>) -> Self {
        self.vitals = vitals;
        self
    }

    /// Resume a session from a recovered snapshot.
    ///
    /// A `Running` snapshot is fast-forwarded by the whole-second gap since
    /// its last tick, as if the tab had kept ticking: elapsed time and
    /// calories catch up, distance and position are taken verbatim (no fixes
    /// were observed during the gap, so there is nothing to extrapolate
    /// from). A `FinishedNotSaved` snapshot resumes unchanged, pending
    /// upstream finalization.
    pub fn from_snapshot(snapshot: &ActivitySnapshot, now_ms: i64) -> Self {
        let config = TrackerConfig::for_mode(snapshot.mode);
        let mut vitals = SimulatedVitals::from_snapshot(
            snapshot.mode,
            snapshot.heart_rate_bpm,
            snapshot.calories_kcal,
        );

        let mut elapsed_seconds = snapshot.elapsed_seconds;
        let mut last_tick_at_ms = snapshot.last_tick_at_ms;
        if snapshot.status == SessionStatus::Running {
            let gap_seconds = ((now_ms - snapshot.last_tick_at_ms) / 1000).max(0) as u64;
            elapsed_seconds += gap_seconds;
            vitals.fast_forward(gap_seconds);
            last_tick_at_ms = now_ms;
            info!(
                "[MotionTracker] Session {} recovered, caught up {}s",
                snapshot.session_id, gap_seconds
            );
        } else {
            info!(
                "[MotionTracker] Session {} recovered as {:?}, no catch-up",
                snapshot.session_id, snapshot.status
            );
        }

        Self {
            user_id: snapshot.user_id.clone(),
            session_id: snapshot.session_id.clone(),
            status: snapshot.status,
            classifier: MovementClassifier::from_snapshot(
                snapshot.movement_state,
                snapshot.stationary_time_seconds,
            ),
            accumulator: DistanceAccumulator::from_snapshot(
                config.anchor_accuracy_bound_meters,
                snapshot.accumulated_distance_km,
            ),
            // Anchors are not persisted; the next usable fix re-establishes them
            filter_anchor: None,
            raw_fix_log: snapshot.raw_fix_log.clone(),
            elapsed_seconds,
            last_tick_at_ms,
            vitals: Box::new(vitals),
            gps_available: config.mode.uses_gps(),
            config,
        }
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    /// Handle one raw fix from the platform location stream.
    ///
    /// The filter verdict drives the classifier; the accumulator sees the
    /// raw fix independently, so distance truth never depends on the
    /// debounced display state.
    pub fn ingest_fix(&mut self, fix: LocationFix) -> LiveStats {
        if self.status != SessionStatus::Running || !self.gps_available {
            return self.live_stats();
        }

        let verdict = filter::evaluate(fix, self.filter_anchor.as_ref(), &self.config);
        if verdict.accepted() {
            self.filter_anchor = Some(fix);
        }
        self.classifier.observe(&verdict, &self.config);

        self.accumulator.accumulate(&fix);

        self.raw_fix_log.push(fix);
        if self.raw_fix_log.len() > MAX_RAW_FIX_LOG {
            self.raw_fix_log.remove(0);
        }

        self.live_stats()
    }

    /// Handle one 1 Hz timer tick.
    ///
    /// Independent of fix arrival; drives elapsed time, stationary time and
    /// vitals.
    pub fn tick(&mut self, now_ms: i64) -> LiveStats {
        if self.status != SessionStatus::Running {
            return self.live_stats();
        }

        self.elapsed_seconds += 1;
        self.last_tick_at_ms = now_ms;
        self.classifier.tick_second();
        self.vitals.tick(self.classifier.state());

        self.live_stats()
    }

    /// Degrade to no-GPS mode after the platform denied location permission.
    ///
    /// Surfaced upstream once as a non-blocking warning; the timer, vitals
    /// and the rest of the workout continue, GPS-dependent outputs stay
    /// empty.
    pub fn set_gps_unavailable(&mut self) {
        if self.gps_available {
            warn!(
                "[MotionTracker] Session {}: location permission lost, continuing without GPS",
                self.session_id
            );
        }
        self.gps_available = false;
    }

    /// Stop the session: tear down anchors, mark the snapshot as pending
    /// finalization and produce the final payload.
    pub fn stop(&mut self, now_ms: i64) -> SessionSummary {
        self.status = SessionStatus::FinishedNotSaved;
        self.last_tick_at_ms = now_ms;
        // Anchors never survive a session; a stale anchor would give the
        // next workout a spurious zero-distance first fix.
        self.filter_anchor = None;
        self.accumulator.reset();

        info!(
            "[MotionTracker] Session {} stopped: {}s, {:.3} km",
            self.session_id,
            self.elapsed_seconds,
            self.accumulator.total_km()
        );

        self.summary()
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// The live `{movementState, distance, pace}` tuple plus vitals.
    pub fn live_stats(&self) -> LiveStats {
        let vitals: VitalsSample = self.vitals.current();
        let pace = if self.gps_available {
            pace::estimate(
                self.elapsed_seconds,
                self.accumulator.total_km(),
                self.classifier.state(),
                self.config.min_distance_km_for_pace,
            )
        } else {
            None
        };

        LiveStats {
            movement_state: self.classifier.state(),
            distance_km: self.accumulator.total_km(),
            pace_min_per_km: pace,
            elapsed_seconds: self.elapsed_seconds,
            stationary_seconds: self.classifier.stationary_seconds(),
            paused: self.classifier.is_paused(),
            heart_rate_bpm: vitals.heart_rate_bpm,
            calories_kcal: vitals.calories_kcal,
            gps_available: self.gps_available,
        }
    }

    /// Final payload. The GPS portion exists only for GPS-backed modes.
    pub fn summary(&self) -> SessionSummary {
        let gps = self.config.mode.uses_gps().then(|| GpsTrackSummary {
            distance_km: self.accumulator.total_km(),
            pace_avg_min_per_km: pace::average_pace_min_per_km(
                self.elapsed_seconds,
                self.accumulator.total_km(),
            ),
            route: self.raw_fix_log.clone(),
            route_length_meters: polyline_length_meters(&self.raw_fix_log),
            bounds: Bounds::from_fixes(&self.raw_fix_log),
        });

        SessionSummary {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            elapsed_seconds: self.elapsed_seconds,
            calories_kcal: self.vitals.current().calories_kcal,
            gps,
        }
    }

    /// Durable image of the current state, written once per tick.
    pub fn snapshot(&self) -> ActivitySnapshot {
        let vitals = self.vitals.current();
        ActivitySnapshot {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            mode: self.config.mode,
            status: self.status,
            elapsed_seconds: self.elapsed_seconds,
            accumulated_distance_km: self.accumulator.total_km(),
            movement_state: self.classifier.state(),
            stationary_time_seconds: self.classifier.stationary_seconds(),
            heart_rate_bpm: vitals.heart_rate_bpm,
            calories_kcal: vitals.calories_kcal,
            raw_fix_log: self.raw_fix_log.clone(),
            last_tick_at_ms: self.last_tick_at_ms,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global session slot.
///
/// This singleton lets FFI calls drive the active session without passing
/// state back and forth across the FFI boundary. At most one session is
/// active at a time.
pub static SESSION: Lazy<Mutex<Option<TrackingSession>>> = Lazy::new(|| Mutex::new(None));

/// Run `f` against the active session, if any.
pub fn with_session<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut TrackingSession) -> R,
{
    let mut session = SESSION.lock().unwrap();
    session.as_mut().map(f)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::SimulatedVitals;
    use crate::ActivityMode;

    fn running_session() -> TrackingSession {
        TrackingSession::start(
            "u1",
            "s1",
            TrackerConfig::for_mode(ActivityMode::Running),
            0,
        )
        .with_vitals(Box::new(SimulatedVitals::with_seed(ActivityMode::Running, 7)))
    }

    // ~11.1m apart per step, 10m accuracy, one fix per 5s
    fn walk_fix(step: i64) -> LocationFix {
        LocationFix::new(45.0 + step as f64 * 0.0001, 7.0, 10.0, step * 5_000)
    }

    #[test]
    fn test_session_reaches_moving_and_accrues_distance() {
        let mut session = running_session();

        let mut last = None;
        for step in 0..5 {
            last = Some(session.ingest_fix(walk_fix(step)));
        }
        let stats = last.unwrap();
        assert_eq!(stats.movement_state, MovementState::Moving);
        assert!(stats.distance_km > 0.03 && stats.distance_km < 0.06);
    }

    #[test]
    fn test_distance_accrues_while_classifier_still_stationary() {
        let mut session = running_session();

        // Two good fixes: classifier still needs a third to confirm moving,
        // but the accumulator already accrued the displacement
        session.ingest_fix(walk_fix(0));
        let stats = session.ingest_fix(walk_fix(1));
        assert_eq!(stats.movement_state, MovementState::Stationary);
        assert!(stats.distance_km > 0.0);
    }

    #[test]
    fn test_pace_appears_after_mode_floor() {
        let mut session = running_session();

        // 0.05 km floor: ~11.1m per step needs 6 accruals
        for step in 0..4 {
            let stats = session.ingest_fix(walk_fix(step));
            assert_eq!(stats.pace_min_per_km, None);
        }
        for _ in 0..30 {
            session.tick(0);
        }
        let mut stats = session.live_stats();
        for step in 4..8 {
            stats = session.ingest_fix(walk_fix(step));
        }
        assert!(stats.distance_km >= 0.05);
        assert!(stats.pace_min_per_km.is_some());
        assert!(stats.pace_min_per_km.unwrap().is_finite());
    }

    #[test]
    fn test_tick_advances_elapsed_and_vitals() {
        let mut session = running_session();
        let before = session.live_stats();
        let after = session.tick(1_000);
        assert_eq!(after.elapsed_seconds, before.elapsed_seconds + 1);
        assert!(after.calories_kcal > before.calories_kcal);
    }

    #[test]
    fn test_gps_loss_degrades_without_stopping() {
        let mut session = running_session();
        session.ingest_fix(walk_fix(0));
        session.set_gps_unavailable();

        // Fixes are ignored now
        let stats = session.ingest_fix(walk_fix(1));
        assert_eq!(stats.distance_km, 0.0);
        assert_eq!(stats.pace_min_per_km, None);
        assert!(!stats.gps_available);

        // The timer keeps running
        let stats = session.tick(5_000);
        assert_eq!(stats.elapsed_seconds, 1);
        assert_eq!(session.status(), SessionStatus::Running);
    }

    #[test]
    fn test_indoor_mode_has_no_gps_summary() {
        let mut session = TrackingSession::start(
            "u1",
            "s-indoor",
            TrackerConfig::for_mode(ActivityMode::Indoor),
            0,
        );
        session.tick(1_000);
        let summary = session.stop(2_000);
        assert!(summary.gps.is_none());
        assert_eq!(summary.elapsed_seconds, 1);
    }

    #[test]
    fn test_stop_produces_gps_payload_and_discards_anchors() {
        let mut session = running_session();
        for step in 0..5 {
            session.ingest_fix(walk_fix(step));
        }
        for _ in 0..25 {
            session.tick(0);
        }

        let summary = session.stop(30_000);
        assert_eq!(session.status(), SessionStatus::FinishedNotSaved);

        let gps = summary.gps.expect("running mode has a GPS payload");
        assert!(gps.distance_km > 0.0);
        assert_eq!(gps.route.len(), 5);
        assert!(gps.bounds.is_some());
        assert!(gps.route_length_meters > 0.0);
        assert!(gps.pace_avg_min_per_km.is_some());
    }

    #[test]
    fn test_fix_log_is_bounded() {
        let mut session = running_session();
        for step in 0..(MAX_RAW_FIX_LOG as i64 + 50) {
            session.ingest_fix(walk_fix(step));
        }
        let snapshot = session.snapshot();
        assert_eq!(snapshot.raw_fix_log.len(), MAX_RAW_FIX_LOG);
        // Oldest fixes were dropped
        assert_eq!(snapshot.raw_fix_log[0].timestamp_ms, 50 * 5_000);
    }

    #[test]
    fn test_snapshot_reflects_live_state() {
        let mut session = running_session();
        for step in 0..5 {
            session.ingest_fix(walk_fix(step));
        }
        session.tick(26_000);

        let snapshot = session.snapshot();
        let stats = session.live_stats();
        assert_eq!(snapshot.accumulated_distance_km, stats.distance_km);
        assert_eq!(snapshot.movement_state, stats.movement_state);
        assert_eq!(snapshot.elapsed_seconds, stats.elapsed_seconds);
        assert_eq!(snapshot.last_tick_at_ms, 26_000);
        assert_eq!(snapshot.status, SessionStatus::Running);
    }

    #[test]
    fn test_running_snapshot_catches_up_on_restore() {
        let mut session = running_session();
        for step in 0..5 {
            session.ingest_fix(walk_fix(step));
        }
        for i in 1..=20 {
            session.tick(i * 1_000);
        }
        let snapshot = session.snapshot();
        assert_eq!(snapshot.elapsed_seconds, 20);

        // 95s pass while the tab is gone
        let restored = TrackingSession::from_snapshot(&snapshot, 20_000 + 95_000);
        assert_eq!(restored.elapsed_seconds(), 20 + 95);
        // Distance is verbatim, never extrapolated
        assert_eq!(
            restored.live_stats().distance_km,
            snapshot.accumulated_distance_km
        );
    }

    #[test]
    fn test_finished_snapshot_restores_without_catch_up() {
        let mut session = running_session();
        for i in 1..=10 {
            session.tick(i * 1_000);
        }
        session.stop(10_000);

        let snapshot = session.snapshot();
        let restored = TrackingSession::from_snapshot(&snapshot, 10_000 + 300_000);
        assert_eq!(restored.elapsed_seconds(), 10);
        assert_eq!(restored.status(), SessionStatus::FinishedNotSaved);
    }

    #[test]
    fn test_restore_ignores_clock_going_backwards() {
        let mut session = running_session();
        session.tick(10_000);
        let snapshot = session.snapshot();

        // A clock that went backwards must not shrink elapsed time
        let restored = TrackingSession::from_snapshot(&snapshot, 5_000);
        assert_eq!(restored.elapsed_seconds(), 1);
    }

    #[test]
    fn test_stopped_session_ignores_events() {
        let mut session = running_session();
        session.stop(1_000);
        let stats = session.ingest_fix(walk_fix(0));
        assert_eq!(stats.distance_km, 0.0);
        let stats = session.tick(2_000);
        assert_eq!(stats.elapsed_seconds, 0);
    }
}
