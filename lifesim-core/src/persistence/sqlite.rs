//! SQLite backend.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS profiles (
//!     id         TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS checkpoints (
//!     seq        INTEGER PRIMARY KEY AUTOINCREMENT,
//!     profile_id TEXT NOT NULL,
//!     age        INTEGER NOT NULL,
//!     created_at TEXT NOT NULL,
//!     snapshot   BLOB NOT NULL
//! );
//! ```
//!
//! NPCs and life history live inside the profile's JSON, so deleting a
//! profile row removes them with it. Checkpoints reference profiles by id
//! only and are never cascaded.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use super::{CheckpointRepository, ProfileRepository};
use crate::checkpoint::Checkpoint;
use crate::config::PersistenceConfig;
use crate::error::{CoreError, Result};
use crate::types::{Profile, ProfileId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        id         TEXT PRIMARY KEY,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS checkpoints (
        seq        INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_id TEXT NOT NULL,
        age        INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        snapshot   BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_checkpoints_profile ON checkpoints (profile_id, age);
";

/// Handle to an SQLite database holding profiles and checkpoints.
///
/// The connection sits behind a mutex so the store can be shared across
/// tasks; every operation is a single short statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "SQLite store opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl ProfileRepository for SqliteStore {
    fn load_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let data: Option<Vec<u8>> = conn
            .prepare_cached("SELECT data FROM profiles WHERE id = ?1")?
            .query_row(params![id.as_str()], |row| row.get(0))
            .optional()?;

        let Some(data) = data else {
            return Ok(None);
        };

        let profile: Profile = serde_json::from_slice(&data)?;
        debug!(
            profile = %id,
            age = profile.current_age,
            elapsed_us = start.elapsed().as_micros(),
            "Loaded profile"
        );
        Ok(Some(profile))
    }

    fn save_profile(&self, profile: &Profile) -> Result<()> {
        let start = Instant::now();
        let json = serde_json::to_vec(profile)?;
        let now = Utc::now().to_rfc3339();

        self.conn.lock().execute(
            "INSERT INTO profiles (id, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![profile.id.as_str(), json, now],
        )?;

        debug!(
            profile = %profile.id,
            age = profile.current_age,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved profile"
        );
        Ok(())
    }

    fn delete_profile(&self, id: &ProfileId) -> Result<bool> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM profiles WHERE id = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn list_profiles(&self) -> Result<Vec<ProfileId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT id FROM profiles ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|row| row.map(ProfileId))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl CheckpointRepository for SqliteStore {
    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> Result<u64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO checkpoints (profile_id, age, created_at, snapshot)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                checkpoint.profile_id.as_str(),
                checkpoint.age,
                checkpoint.created_at.to_rfc3339(),
                checkpoint.snapshot.as_bytes(),
            ],
        )?;
        let seq = u64::try_from(conn.last_insert_rowid())
            .map_err(|e| CoreError::Serialization(format!("negative checkpoint rowid: {e}")))?;
        Ok(seq)
    }

    fn checkpoints_for(&self, profile: &ProfileId) -> Result<Vec<Checkpoint>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT seq, age, created_at, snapshot FROM checkpoints
             WHERE profile_id = ?1
             ORDER BY age DESC, seq DESC",
        )?;

        let rows = stmt.query_map(params![profile.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut checkpoints = Vec::new();
        for row in rows {
            let (seq, age, created_at, snapshot) = row?;
            let created_at = match DateTime::parse_from_rfc3339(&created_at) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!(seq, error = %e, "Unreadable checkpoint timestamp");
                    DateTime::<Utc>::UNIX_EPOCH
                }
            };
            checkpoints.push(Checkpoint {
                seq: u64::try_from(seq).unwrap_or_default(),
                profile_id: profile.clone(),
                age,
                created_at,
                snapshot: String::from_utf8(snapshot)
                    .map_err(|e| CoreError::Serialization(e.to_string()))?,
            });
        }
        Ok(checkpoints)
    }

    fn delete_checkpoint(&self, seq: u64) -> Result<bool> {
        let seq = i64::try_from(seq).map_err(|e| CoreError::Serialization(e.to_string()))?;
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM checkpoints WHERE seq = ?1", params![seq])?;
        Ok(deleted > 0)
    }
}
