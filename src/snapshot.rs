//! Persisted session snapshot.
//!
//! The snapshot is a flat JSON object written to client-local storage on
//! every tick while the tab is alive, and read back after a reload to resume
//! the workout exactly where it left off.
//!
//! Reads are lenient by contract: a field that is missing or fails to parse
//! falls back to its documented default instead of aborting recovery of the
//! whole session. Only a payload that is not a JSON object at all is
//! considered corrupt.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::{ActivityMode, LocationFix, MovementState, SessionStatus};

/// Maximum number of fixes kept in the persisted raw fix log.
///
/// Two hours at the 1 Hz platform cadence; older fixes are dropped first.
pub const MAX_RAW_FIX_LOG: usize = 7200;

/// Durable image of one session's tracking state.
///
/// `accumulated_distance_km` is non-decreasing for the lifetime of one
/// `session_id`, and recovery takes it verbatim — distance is never
/// extrapolated across a gap in which no fixes were observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub session_id: String,
    pub user_id: String,
    pub mode: ActivityMode,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    pub accumulated_distance_km: f64,
    pub movement_state: MovementState,
    pub stationary_time_seconds: u64,
    pub heart_rate_bpm: u16,
    pub calories_kcal: f64,
    pub raw_fix_log: Vec<LocationFix>,
    /// Wall-clock time of the last write, for recovery catch-up.
    pub last_tick_at_ms: i64,
}

impl ActivitySnapshot {
    /// Serialize to the flat JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TrackerError::Internal {
            message: format!("snapshot serialization failed: {}", e),
        })
    }

    /// Parse a stored snapshot, field by field, with defaults.
    ///
    /// Fails only when `raw` is not a JSON object; every individual field is
    /// recovered independently (e.g. a negative `elapsedSeconds` is discarded
    /// to 0 rather than poisoning the session).
    pub fn parse_lenient(key: &str, raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| TrackerError::CorruptSnapshot {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let obj = value.as_object().ok_or_else(|| TrackerError::CorruptSnapshot {
            key: key.to_string(),
            message: "not a JSON object".to_string(),
        })?;

        let raw_fix_log: Vec<LocationFix> = obj
            .get("rawFixLog")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect::<Vec<LocationFix>>()
            })
            .unwrap_or_default();
        // Keep the newest fixes when an oversized log comes back
        let raw_fix_log = if raw_fix_log.len() > MAX_RAW_FIX_LOG {
            raw_fix_log[raw_fix_log.len() - MAX_RAW_FIX_LOG..].to_vec()
        } else {
            raw_fix_log
        };

        Ok(Self {
            session_id: string_field(obj, "sessionId"),
            user_id: string_field(obj, "userId"),
            mode: enum_field(obj, "mode", ActivityMode::Running),
            status: enum_field(obj, "status", SessionStatus::Idle),
            elapsed_seconds: non_negative_int_field(obj, "elapsedSeconds"),
            accumulated_distance_km: non_negative_float_field(obj, "accumulatedDistanceKm"),
            movement_state: enum_field(obj, "movementState", MovementState::Stationary),
            stationary_time_seconds: non_negative_int_field(obj, "stationaryTimeSeconds"),
            heart_rate_bpm: non_negative_int_field(obj, "heartRateBpm").min(u16::MAX as u64) as u16,
            calories_kcal: non_negative_float_field(obj, "caloriesKcal"),
            raw_fix_log,
            last_tick_at_ms: obj
                .get("lastTickAtMs")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        })
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, name: &str) -> String {
    obj.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn non_negative_int_field(obj: &serde_json::Map<String, Value>, name: &str) -> u64 {
    // Tolerates float encodings ("125.0") from JavaScript writers
    obj.get(name)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0)
}

fn non_negative_float_field(obj: &serde_json::Map<String, Value>, name: &str) -> f64 {
    obj.get(name)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

fn enum_field<T: serde::de::DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    name: &str,
    default: T,
) -> T {
    obj.get(name)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(default)
}
