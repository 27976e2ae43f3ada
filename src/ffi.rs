//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the tracking core to
//! Kotlin and Swift. The host drives the active session through the global
//! singleton: it forwards location fixes and timer ticks, and owns
//! client-local storage (snapshots cross the boundary as the flat JSON wire
//! format, so the host can put them wherever the platform allows).

use log::{debug, info, warn};

use crate::session::{LiveStats, SessionSummary, TrackingSession, SESSION};
use crate::snapshot::ActivitySnapshot;
use crate::{init_logging, with_session, ActivityMode, LocationFix, TrackerConfig};

/// Start a session for the given mode, replacing any previous one.
#[uniffi::export]
pub fn session_start(user_id: String, session_id: String, mode: ActivityMode, now_ms: i64) {
    init_logging();
    info!(
        "[MotionTrackerRust] session_start {} (mode {:?})",
        session_id, mode
    );
    let session = TrackingSession::start(&user_id, &session_id, TrackerConfig::for_mode(mode), now_ms);
    *SESSION.lock().unwrap() = Some(session);
}

/// Forward one location fix. Returns the refreshed live stats, or `None`
/// when no session is active.
#[uniffi::export]
pub fn session_ingest_fix(fix: LocationFix) -> Option<LiveStats> {
    debug!(
        "[MotionTrackerRust] fix ({:.6}, {:.6}) acc {:.1}m",
        fix.latitude, fix.longitude, fix.accuracy_meters
    );
    with_session(|s| s.ingest_fix(fix))
}

/// Advance the 1 Hz session timer.
#[uniffi::export]
pub fn session_tick(now_ms: i64) -> Option<LiveStats> {
    with_session(|s| s.tick(now_ms))
}

/// Current live stats without advancing anything.
#[uniffi::export]
pub fn session_live_stats() -> Option<LiveStats> {
    with_session(|s| s.live_stats())
}

/// The platform denied (or revoked) location permission. The session keeps
/// running without GPS-derived outputs.
#[uniffi::export]
pub fn session_permission_lost() {
    init_logging();
    with_session(|s| s.set_gps_unavailable());
}

/// Stop the active session and return the final payload.
#[uniffi::export]
pub fn session_stop(now_ms: i64) -> Option<SessionSummary> {
    init_logging();
    let summary = with_session(|s| s.stop(now_ms));
    if let Some(ref summary) = summary {
        info!(
            "[MotionTrackerRust] session_stop {}: {}s",
            summary.session_id, summary.elapsed_seconds
        );
    }
    summary
}

/// Serialize the active session's snapshot for host-side storage.
#[uniffi::export]
pub fn session_snapshot_json() -> Option<String> {
    with_session(|s| s.snapshot().to_json().ok()).flatten()
}

/// Restore a session from a host-provided snapshot payload.
///
/// Returns `false` when the payload is unreadable; individual corrupt fields
/// fall back to defaults and still restore.
#[uniffi::export]
pub fn session_restore_json(raw: String, now_ms: i64) -> bool {
    init_logging();
    match ActivitySnapshot::parse_lenient("host", &raw) {
        Ok(snapshot) => {
            info!(
                "[MotionTrackerRust] session_restore {} ({:?})",
                snapshot.session_id, snapshot.status
            );
            *SESSION.lock().unwrap() = Some(TrackingSession::from_snapshot(&snapshot, now_ms));
            true
        }
        Err(e) => {
            warn!("[MotionTrackerRust] session_restore failed: {}", e);
            false
        }
    }
}

/// Drop the active session without producing a summary.
#[uniffi::export]
pub fn session_discard() {
    info!("[MotionTrackerRust] session_discard");
    *SESSION.lock().unwrap() = None;
}
