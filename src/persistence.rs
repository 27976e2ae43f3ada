//! # SQLite Snapshot Store
//!
//! Durable [`SnapshotStore`] backed by a single SQLite table, for hosts that
//! grant real storage (mobile builds, Electron-style shells). The value
//! column holds the same flat JSON the in-memory store holds, so the wire
//! contract is identical across backends.

#[cfg(feature = "persistence")]
use std::sync::Mutex;

#[cfg(feature = "persistence")]
use rusqlite::{params, Connection, OptionalExtension};

#[cfg(feature = "persistence")]
use crate::error::{Result, TrackerError};

#[cfg(feature = "persistence")]
use crate::snapshot::ActivitySnapshot;

#[cfg(feature = "persistence")]
use crate::store::SnapshotStore;

/// SQLite-backed snapshot store.
///
/// The connection lives behind a mutex because [`SnapshotStore`] is shared
/// between the tick loop and recovery; contention is negligible at a 1 Hz
/// write cadence.
#[cfg(feature = "persistence")]
pub struct SqliteSnapshotStore {
    db: Mutex<Connection>,
}

#[cfg(feature = "persistence")]
impl SqliteSnapshotStore {
    /// Open (or create) a store at the given database path.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path).map_err(storage_err)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().map_err(storage_err)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )
        .map_err(storage_err)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| TrackerError::StorageError {
            message: "snapshot db lock poisoned".to_string(),
        })
    }
}

#[cfg(feature = "persistence")]
impl SnapshotStore for SqliteSnapshotStore {
    fn get(&self, key: &str) -> Result<Option<ActivitySnapshot>> {
        let db = self.lock()?;
        let raw: Option<String> = db
            .query_row(
                "SELECT data FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;

        match raw {
            Some(raw) => ActivitySnapshot::parse_lenient(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, snapshot: &ActivitySnapshot) -> Result<()> {
        let raw = snapshot.to_json()?;
        let db = self.lock()?;
        db.execute(
            "INSERT OR REPLACE INTO snapshots (key, data, updated_at) \
             VALUES (?1, ?2, strftime('%s', 'now'))",
            params![key, raw],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let db = self.lock()?;
        db.execute("DELETE FROM snapshots WHERE key = ?1", params![key])
            .map_err(storage_err)?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let db = self.lock()?;
        let mut stmt = db
            .prepare("SELECT key FROM snapshots")
            .map_err(storage_err)?;
        // Prefix filtering happens here rather than with LIKE: keys contain
        // underscores, which LIKE treats as wildcards.
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_err)?
            .filter_map(|k| k.ok())
            .filter(|k| k.starts_with(prefix))
            .collect();
        Ok(keys)
    }
}

#[cfg(feature = "persistence")]
fn storage_err(e: rusqlite::Error) -> TrackerError {
    TrackerError::StorageError {
        message: e.to_string(),
    }
}
