//! Keyed snapshot store abstraction.
//!
//! Snapshots live in client-local storage under
//! `${namespace}_${userId}_${sessionId}` keys. This module is the single
//! place those keys are built, replacing ad hoc string concatenation at call
//! sites, and defines the storage seam the recovery layer works against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{Result, TrackerError};
use crate::snapshot::ActivitySnapshot;

/// Build the storage key for one session's snapshot.
pub fn snapshot_key(namespace: &str, user_id: &str, session_id: &str) -> String {
    format!("{}_{}_{}", namespace, user_id, session_id)
}

/// Key prefix covering every session snapshot of one user.
pub fn user_key_prefix(namespace: &str, user_id: &str) -> String {
    format!("{}_{}_", namespace, user_id)
}

/// Keyed storage for [`ActivitySnapshot`]s.
///
/// Values are the flat JSON wire format; `get` parses leniently, so a
/// snapshot with corrupt fields still comes back (with defaults) and only an
/// unreadable payload is an error.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<ActivitySnapshot>>;
    fn put(&self, key: &str, snapshot: &ActivitySnapshot) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    /// All keys starting with `prefix`, in unspecified order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory store: the in-tab fallback when no durable storage is granted,
/// and the fixture for tests.
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put` fail, to exercise the fire-and-forget
    /// write path (quota exhaustion behaves this way in browsers).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> Result<Option<ActivitySnapshot>> {
        let entries = self.entries.lock().map_err(|_| TrackerError::StorageError {
            message: "store lock poisoned".to_string(),
        })?;
        match entries.get(key) {
            Some(raw) => ActivitySnapshot::parse_lenient(key, raw).map(Some),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, snapshot: &ActivitySnapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrackerError::StorageError {
                message: "quota exceeded".to_string(),
            });
        }
        let raw = snapshot.to_json()?;
        let mut entries = self.entries.lock().map_err(|_| TrackerError::StorageError {
            message: "store lock poisoned".to_string(),
        })?;
        entries.insert(key.to_string(), raw);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| TrackerError::StorageError {
            message: "store lock poisoned".to_string(),
        })?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| TrackerError::StorageError {
            message: "store lock poisoned".to_string(),
        })?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityMode, MovementState, SessionStatus};

    fn snapshot(session_id: &str) -> ActivitySnapshot {
        ActivitySnapshot {
            session_id: session_id.to_string(),
            user_id: "u1".to_string(),
            mode: ActivityMode::Running,
            status: SessionStatus::Running,
            elapsed_seconds: 10,
            accumulated_distance_km: 0.1,
            movement_state: MovementState::Moving,
            stationary_time_seconds: 0,
            heart_rate_bpm: 140,
            calories_kcal: 1.8,
            raw_fix_log: vec![],
            last_tick_at_ms: 10_000,
        }
    }

    #[test]
    fn test_key_construction() {
        assert_eq!(snapshot_key("fitapp", "u1", "s1"), "fitapp_u1_s1");
        assert_eq!(user_key_prefix("fitapp", "u1"), "fitapp_u1_");
        assert!(snapshot_key("fitapp", "u1", "s1").starts_with(&user_key_prefix("fitapp", "u1")));
    }

    #[test]
    fn test_put_get_delete_round_trip() {
        let store = MemorySnapshotStore::new();
        let key = snapshot_key("fitapp", "u1", "s1");

        assert!(store.get(&key).unwrap().is_none());

        store.put(&key, &snapshot("s1")).unwrap();
        let loaded = store.get(&key).unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");

        store.delete(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_keys_filters_by_prefix() {
        let store = MemorySnapshotStore::new();
        store
            .put(&snapshot_key("fitapp", "u1", "s1"), &snapshot("s1"))
            .unwrap();
        store
            .put(&snapshot_key("fitapp", "u1", "s2"), &snapshot("s2"))
            .unwrap();
        store
            .put(&snapshot_key("fitapp", "u2", "s3"), &snapshot("s3"))
            .unwrap();

        let mut keys = store.keys(&user_key_prefix("fitapp", "u1")).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["fitapp_u1_s1", "fitapp_u1_s2"]);
    }

    #[test]
    fn test_failed_writes_surface_as_storage_errors() {
        let store = MemorySnapshotStore::new();
        store.set_fail_writes(true);
        let err = store
            .put(&snapshot_key("fitapp", "u1", "s1"), &snapshot("s1"))
            .unwrap_err();
        assert!(matches!(err, TrackerError::StorageError { .. }));
        assert!(store.is_empty());
    }
}
