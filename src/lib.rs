//! # Motion Tracker
//!
//! Real-time GPS motion tracking core for workout sessions.
//!
//! This library turns a noisy stream of consumer-grade location fixes into
//! stable, live workout metrics:
//! - Movement classification (moving / stationary / weak signal) with hysteresis
//! - Monotonically increasing travelled distance
//! - Jitter-free pace estimation
//! - Reload-safe session recovery snapshots
//!
//! ## Features
//!
//! - **`persistence`** - SQLite-backed snapshot storage
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use motion_tracker::{ActivityMode, LocationFix, TrackerConfig, TrackingSession};
//!
//! let config = TrackerConfig::for_mode(ActivityMode::Running);
//! let mut session = TrackingSession::start("user-1", "session-1", config, 0);
//!
//! // Fixes arrive from the platform location service at its own cadence
//! let fix = LocationFix::new(51.5074, -0.1278, 8.0, 1_000);
//! let stats = session.ingest_fix(fix);
//!
//! println!("distance: {:.3} km, state: {:?}", stats.distance_km, stats.movement_state);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Geographic utilities (haversine distance, displacement, polyline length)
pub mod geo_utils;

// Point ingestion filter (accuracy / step / speed gates)
pub mod filter;

// Movement classification state machine
pub mod classifier;
pub use classifier::MovementClassifier;

// Distance accumulation (classifier-independent)
pub mod distance;
pub use distance::DistanceAccumulator;

// Pace estimation
pub mod pace;
pub use pace::{average_pace_min_per_km, estimate as estimate_pace, validate_external_pace};

// Pluggable vitals estimation (heart rate / calories)
pub mod vitals;
pub use vitals::{SimulatedVitals, VitalsEstimator, VitalsSample};

// Stateful tracking session (singleton for host integration)
pub mod session;
pub use session::{
    with_session, GpsTrackSummary, LiveStats, SessionSummary, TrackingSession, SESSION,
};

// Persisted session snapshot
pub mod snapshot;
pub use snapshot::ActivitySnapshot;

// Keyed snapshot store abstraction
pub mod store;
pub use store::{snapshot_key, MemorySnapshotStore, SnapshotStore};

// SQLite snapshot store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteSnapshotStore;

// Session recovery (catch-up, snapshot selection)
pub mod recovery;
pub use recovery::{persist_snapshot, recover_latest, RecoveredSession};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("MotionTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A single timestamped location reading with an accuracy radius.
///
/// Produced by the platform location service and immutable once captured.
/// The `speed_meters_per_second` field comes straight from the platform and
/// is untrusted: it never feeds distance or pace without range validation.
///
/// # Example
/// ```
/// use motion_tracker::LocationFix;
/// let fix = LocationFix::new(51.5074, -0.1278, 12.0, 1_000); // London, 12m accuracy
/// assert!(fix.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters (larger = worse signal).
    pub accuracy_meters: f64,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Platform-reported speed in m/s. Untrusted; see [`validate_external_pace`].
    #[serde(default)]
    pub speed_meters_per_second: Option<f64>,
}

impl LocationFix {
    /// Create a new fix without a platform speed reading.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp_ms,
            speed_meters_per_second: None,
        }
    }

    /// Check if the fix has valid, finite coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a recorded route.
///
/// Pre-computed on the final payload so map consumers never have to walk
/// the full track themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from recorded fixes. Returns `None` for an empty track.
    pub fn from_fixes(fixes: &[LocationFix]) -> Option<Self> {
        if fixes.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for f in fixes {
            min_lat = min_lat.min(f.latitude);
            max_lat = max_lat.max(f.latitude);
            min_lng = min_lng.min(f.longitude);
            max_lng = max_lng.max(f.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds as `(latitude, longitude)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Activity mode for a workout session.
///
/// Chosen at session start and immutable thereafter. Each mode carries its
/// own filter thresholds (see [`TrackerConfig::for_mode`]); `Indoor` is the
/// no-GPS mode used for manual workouts and permission-denied degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityMode {
    Running,
    Walking,
    Cycling,
    Indoor,
}

impl ActivityMode {
    /// Whether sessions in this mode consume the platform location stream.
    ///
    /// When `false`, the session still ticks (timer, vitals) but produces no
    /// distance, pace or route.
    pub fn uses_gps(&self) -> bool {
        !matches!(self, ActivityMode::Indoor)
    }
}

/// Per-mode tracking parameters. One instance per session, immutable after start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackerConfig {
    /// Activity mode this configuration was built for.
    pub mode: ActivityMode,

    /// Consecutive accepted fixes required before the state flips to moving.
    /// Default: 3 (running)
    pub min_accepted_fixes_to_confirm_moving: u32,

    /// Consecutive rejected (non-weak) fixes required before the state flips
    /// to stationary. Default: 5 (running)
    pub min_rejected_fixes_to_confirm_stop: u32,

    /// Minimum displacement from the last anchor for a fix to count as
    /// movement, in meters. Default: 2.5 (running)
    pub min_step_meters: f64,

    /// Minimum speed versus the last anchor for a fix to count as movement,
    /// in m/s. Default: 1.0 (running)
    pub min_speed_meters_per_second: f64,

    /// Accuracy radius above which a fix is rejected outright as weak signal,
    /// in meters. Default: 35.0 (running)
    pub weak_signal_accuracy_threshold_meters: f64,

    /// Accuracy radius bound for a fix to act as (or accrue against) a
    /// distance anchor, in meters. Intentionally independent of the
    /// weak-signal threshold: this gates anchor eligibility, not signal
    /// trust. Default: 50.0 (all modes)
    pub anchor_accuracy_bound_meters: f64,

    /// Minimum accumulated distance before a pace is reported, in km.
    /// Prevents wildly unstable pace in the first seconds of a session.
    /// Default: 0.05 (running)
    pub min_distance_km_for_pace: f64,
}

impl TrackerConfig {
    /// Build the tuned configuration for an activity mode.
    ///
    /// Running tolerates more noise at higher speed; walking needs tighter
    /// step/speed thresholds and a slightly higher pace floor.
    pub fn for_mode(mode: ActivityMode) -> Self {
        match mode {
            ActivityMode::Running => Self {
                mode,
                min_accepted_fixes_to_confirm_moving: 3,
                min_rejected_fixes_to_confirm_stop: 5,
                min_step_meters: 2.5,
                min_speed_meters_per_second: 1.0,
                weak_signal_accuracy_threshold_meters: 35.0,
                anchor_accuracy_bound_meters: 50.0,
                min_distance_km_for_pace: 0.05,
            },
            ActivityMode::Walking => Self {
                mode,
                min_accepted_fixes_to_confirm_moving: 4,
                min_rejected_fixes_to_confirm_stop: 4,
                min_step_meters: 1.5,
                min_speed_meters_per_second: 0.5,
                weak_signal_accuracy_threshold_meters: 30.0,
                anchor_accuracy_bound_meters: 50.0,
                min_distance_km_for_pace: 0.07,
            },
            ActivityMode::Cycling => Self {
                mode,
                min_accepted_fixes_to_confirm_moving: 3,
                min_rejected_fixes_to_confirm_stop: 6,
                min_step_meters: 4.0,
                min_speed_meters_per_second: 1.5,
                weak_signal_accuracy_threshold_meters: 40.0,
                anchor_accuracy_bound_meters: 50.0,
                min_distance_km_for_pace: 0.10,
            },
            // Indoor sessions never see fixes; thresholds are generic
            // defaults so a config always exists.
            ActivityMode::Indoor => Self {
                mode,
                min_accepted_fixes_to_confirm_moving: 3,
                min_rejected_fixes_to_confirm_stop: 4,
                min_step_meters: 2.0,
                min_speed_meters_per_second: 0.7,
                weak_signal_accuracy_threshold_meters: 40.0,
                anchor_accuracy_bound_meters: 50.0,
                min_distance_km_for_pace: 0.05,
            },
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::for_mode(ActivityMode::Running)
    }
}

/// Classified movement state for a session.
///
/// Exactly one instance per session, mutated only by [`MovementClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum MovementState {
    Moving,
    Stationary,
    SignalWeak,
}

impl Default for MovementState {
    fn default() -> Self {
        MovementState::Stationary
    }
}

/// Why the point filter rejected a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RejectionReason {
    /// Accuracy radius above the weak-signal threshold (or not finite).
    WeakSignalAccuracy,
    /// Displacement from the anchor below the minimum step.
    BelowMinStep,
    /// Speed versus the anchor below the minimum speed.
    BelowMinSpeed,
}

/// Outcome of ingesting one fix through the point filter.
///
/// Ephemeral: produced once per fix, consumed by the classifier, never
/// persisted individually.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestVerdict {
    /// `None` when the fix was accepted.
    pub rejection: Option<RejectionReason>,
    /// Great-circle displacement from the last anchor in meters
    /// (0.0 for the first accepted fix).
    pub delta_distance_meters: f64,
    /// The fix this verdict was produced for.
    pub fix: LocationFix,
}

impl IngestVerdict {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Lifecycle status of a session, as persisted in its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SessionStatus {
    Idle,
    Running,
    /// Session ended but the final payload has not been durably saved
    /// upstream yet; retried once connectivity allows.
    FinishedNotSaved,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

// ============================================================================
// Tests
// ============================================================================
