//! Session recovery.
//!
//! Makes the in-memory tracking state durable enough to survive a reload or
//! suspend without resetting the user's workout. Writes are fire-and-forget:
//! a failed write (storage quota, denied storage) is logged and ignored, and
//! the live in-memory state stays authoritative for the rest of the tab's
//! lifetime.

use log::{debug, warn};

use crate::session::TrackingSession;
use crate::snapshot::ActivitySnapshot;
use crate::store::{snapshot_key, user_key_prefix, SnapshotStore};
use crate::SessionStatus;

/// A session rebuilt from storage, together with the key it was found under
/// so the caller can delete it after durable finalization.
pub struct RecoveredSession {
    pub key: String,
    pub snapshot: ActivitySnapshot,
    pub session: TrackingSession,
}

/// Persist a session snapshot, swallowing failures.
///
/// Never fatal: quota exhaustion and denied storage simply cost durability,
/// not the live session.
pub fn persist_snapshot(store: &dyn SnapshotStore, namespace: &str, snapshot: &ActivitySnapshot) {
    let key = snapshot_key(namespace, &snapshot.user_id, &snapshot.session_id);
    if let Err(e) = store.put(&key, snapshot) {
        warn!("[MotionTracker] Snapshot write for {} failed (ignored): {}", key, e);
    }
}

/// Find and rebuild the most relevant session for a user.
///
/// Snapshot priority is `running` > `finished_not_saved` > most recent by
/// last tick; ties within a class also go to the most recent. Two sessions
/// are never merged: exactly one snapshot wins and the rest stay untouched.
///
/// A `Running` winner is fast-forwarded to `now_ms` (see
/// [`TrackingSession::from_snapshot`]); a `FinishedNotSaved` winner is
/// returned as-is, pending upstream finalization.
pub fn recover_latest(
    store: &dyn SnapshotStore,
    namespace: &str,
    user_id: &str,
    now_ms: i64,
) -> Option<RecoveredSession> {
    let prefix = user_key_prefix(namespace, user_id);
    let keys = match store.keys(&prefix) {
        Ok(keys) => keys,
        Err(e) => {
            warn!("[MotionTracker] Snapshot scan failed: {}", e);
            return None;
        }
    };

    let mut best: Option<(String, ActivitySnapshot)> = None;
    for key in keys {
        let snapshot = match store.get(&key) {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            // Unreadable snapshots are skipped, not fatal to recovery
            Err(e) => {
                debug!("[MotionTracker] Skipping unreadable snapshot {}: {}", key, e);
                continue;
            }
        };
        let better = match &best {
            None => true,
            Some((_, current)) => {
                let (p_new, p_cur) = (status_priority(snapshot.status), status_priority(current.status));
                p_new > p_cur
                    || (p_new == p_cur && snapshot.last_tick_at_ms > current.last_tick_at_ms)
            }
        };
        if better {
            best = Some((key, snapshot));
        }
    }

    best.map(|(key, snapshot)| {
        let session = TrackingSession::from_snapshot(&snapshot, now_ms);
        RecoveredSession {
            key,
            snapshot,
            session,
        }
    })
}

/// Delete a session's snapshot once it has been durably finalized upstream.
pub fn finalize(
    store: &dyn SnapshotStore,
    namespace: &str,
    user_id: &str,
    session_id: &str,
) -> crate::Result<()> {
    store.delete(&snapshot_key(namespace, user_id, session_id))
}

fn status_priority(status: SessionStatus) -> u8 {
    match status {
        SessionStatus::Running => 2,
        SessionStatus::FinishedNotSaved => 1,
        SessionStatus::Idle => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;
    use crate::{ActivityMode, MovementState};

    const NS: &str = "fitapp";

    fn snapshot(session_id: &str, status: SessionStatus, last_tick_at_ms: i64) -> ActivitySnapshot {
        ActivitySnapshot {
            session_id: session_id.to_string(),
            user_id: "u1".to_string(),
            mode: ActivityMode::Running,
            status,
            elapsed_seconds: 60,
            accumulated_distance_km: 0.5,
            movement_state: MovementState::Moving,
            stationary_time_seconds: 0,
            heart_rate_bpm: 145,
            calories_kcal: 10.0,
            raw_fix_log: vec![],
            last_tick_at_ms,
        }
    }

    #[test]
    fn test_persist_and_recover_round_trip() {
        let store = MemorySnapshotStore::new();
        persist_snapshot(&store, NS, &snapshot("s1", SessionStatus::Running, 60_000));

        let recovered = recover_latest(&store, NS, "u1", 60_000).unwrap();
        assert_eq!(recovered.session.session_id(), "s1");
        assert_eq!(recovered.key, "fitapp_u1_s1");
    }

    #[test]
    fn test_running_beats_finished_beats_recent() {
        let store = MemorySnapshotStore::new();
        // Most recent, but merely idle
        persist_snapshot(&store, NS, &snapshot("s-idle", SessionStatus::Idle, 900_000));
        // Older finished session awaiting upload
        persist_snapshot(
            &store,
            NS,
            &snapshot("s-done", SessionStatus::FinishedNotSaved, 500_000),
        );
        // Oldest of all, but still running
        persist_snapshot(&store, NS, &snapshot("s-live", SessionStatus::Running, 100_000));

        let recovered = recover_latest(&store, NS, "u1", 1_000_000).unwrap();
        assert_eq!(recovered.session.session_id(), "s-live");
    }

    #[test]
    fn test_ties_resolved_by_most_recent_tick() {
        let store = MemorySnapshotStore::new();
        persist_snapshot(
            &store,
            NS,
            &snapshot("s-old", SessionStatus::FinishedNotSaved, 100_000),
        );
        persist_snapshot(
            &store,
            NS,
            &snapshot("s-new", SessionStatus::FinishedNotSaved, 200_000),
        );

        let recovered = recover_latest(&store, NS, "u1", 300_000).unwrap();
        assert_eq!(recovered.session.session_id(), "s-new");
    }

    #[test]
    fn test_running_recovery_catches_up_elapsed_only() {
        let store = MemorySnapshotStore::new();
        persist_snapshot(&store, NS, &snapshot("s1", SessionStatus::Running, 60_000));

        // 90 seconds pass while the tab was backgrounded
        let recovered = recover_latest(&store, NS, "u1", 150_000).unwrap();
        assert_eq!(recovered.session.elapsed_seconds(), 60 + 90);
        // Distance comes back verbatim
        assert_eq!(recovered.session.live_stats().distance_km, 0.5);
    }

    #[test]
    fn test_finished_recovery_has_no_catch_up() {
        let store = MemorySnapshotStore::new();
        persist_snapshot(
            &store,
            NS,
            &snapshot("s1", SessionStatus::FinishedNotSaved, 60_000),
        );

        let recovered = recover_latest(&store, NS, "u1", 999_000).unwrap();
        assert_eq!(recovered.session.elapsed_seconds(), 60);
        assert_eq!(recovered.session.status(), SessionStatus::FinishedNotSaved);
    }

    #[test]
    fn test_other_users_sessions_are_invisible() {
        let store = MemorySnapshotStore::new();
        let mut other = snapshot("s1", SessionStatus::Running, 60_000);
        other.user_id = "u2".to_string();
        persist_snapshot(&store, NS, &other);

        assert!(recover_latest(&store, NS, "u1", 100_000).is_none());
    }

    #[test]
    fn test_failed_writes_are_swallowed() {
        let store = MemorySnapshotStore::new();
        store.set_fail_writes(true);
        // Must not panic or propagate
        persist_snapshot(&store, NS, &snapshot("s1", SessionStatus::Running, 60_000));
        assert!(recover_latest(&store, NS, "u1", 100_000).is_none());
    }

    #[test]
    fn test_finalize_deletes_snapshot() {
        let store = MemorySnapshotStore::new();
        persist_snapshot(
            &store,
            NS,
            &snapshot("s1", SessionStatus::FinishedNotSaved, 60_000),
        );
        finalize(&store, NS, "u1", "s1").unwrap();
        assert!(recover_latest(&store, NS, "u1", 100_000).is_none());
    }
}
