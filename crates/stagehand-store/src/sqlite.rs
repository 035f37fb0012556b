//! SQLite-backed versioned store
//!
//! Each object is one row of `objects` holding a JSON payload and an integer
//! version. A conditional write is a single `UPDATE ... WHERE version = ?`
//! inside a transaction that also appends to `commit_log`. Once the update
//! has been submitted, a failing `COMMIT` is reported as an unknown outcome
//! rather than an error: the write may or may not be durable.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use stagehand_core::{CommitOutcome, Versioned, VersionedStore};

use crate::db;
use crate::errors::{
    from_json, from_rusqlite, lock_poisoned, object_exists, object_not_found, Result, StoreError,
};
use crate::migrations::apply_migrations;

/// One committed version of an object, as recorded in `commit_log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub version: u64,
    /// Hex SHA-256 of the JSON payload written at this version
    pub payload_digest: String,
    /// Unix milliseconds
    pub committed_at: i64,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store file and bring its schema up to date
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the database cannot be opened, configured
    /// or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    /// Open a private in-memory store
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new object at version 1
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when `object_id` is taken, `Serialization`
    /// when the value cannot be encoded.
    pub fn create<T: Serialize>(&self, object_id: &str, value: &T) -> Result<u64> {
        let payload = serde_json::to_string(value).map_err(from_json)?;
        let now = chrono::Utc::now().timestamp_millis();
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(from_rusqlite)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT version FROM objects WHERE object_id = ?1",
                [object_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        if exists.is_some() {
            return Err(object_exists("sqlite_store.create", object_id));
        }

        tx.execute(
            "INSERT INTO objects (object_id, version, payload, created_at, updated_at)
             VALUES (?1, 1, ?2, ?3, ?3)",
            rusqlite::params![object_id, payload, now],
        )
        .map_err(from_rusqlite)?;
        record_commit(&tx, object_id, 1, &payload, now)?;
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(object_id = object_id, "Created object");
        Ok(1)
    }

    /// Committed versions of an object, oldest first
    ///
    /// This is the read-back used to reconcile after an unknown outcome.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the query fails.
    pub fn history(&self, object_id: &str) -> Result<Vec<CommitRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT version, payload_digest, committed_at
                 FROM commit_log
                 WHERE object_id = ?1
                 ORDER BY version ASC",
            )
            .map_err(from_rusqlite)?;

        let rows = stmt
            .query_map([object_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(version, payload_digest, committed_at)| {
                Ok(CommitRecord {
                    version: from_sql_version(version)?,
                    payload_digest,
                    committed_at,
                })
            })
            .collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| lock_poisoned())
    }
}

impl<T> VersionedStore<T> for SqliteStore
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self, object_id: &str) -> Result<Versioned<T>> {
        let conn = self.lock()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT version, payload FROM objects WHERE object_id = ?1",
                [object_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        let (version, payload) =
            row.ok_or_else(|| object_not_found("sqlite_store.load", object_id))?;
        let value = serde_json::from_str(&payload).map_err(from_json)?;
        Ok(Versioned::new(from_sql_version(version)?, value))
    }

    fn compare_and_swap(
        &self,
        object_id: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<CommitOutcome> {
        let payload = serde_json::to_string(value).map_err(from_json)?;
        let new_version = expected_version
            .checked_add(1)
            .ok_or_else(|| StoreError::VersionOutOfRange(expected_version.to_string()))?;
        let expected_sql = to_sql_version(expected_version)?;
        let new_sql = to_sql_version(new_version)?;
        let now = chrono::Utc::now().timestamp_millis();

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(from_rusqlite)?;

        let updated = tx
            .execute(
                "UPDATE objects SET version = ?1, payload = ?2, updated_at = ?3
                 WHERE object_id = ?4 AND version = ?5",
                rusqlite::params![new_sql, payload, now, object_id, expected_sql],
            )
            .map_err(from_rusqlite)?;

        if updated == 0 {
            let actual: Option<i64> = tx
                .query_row(
                    "SELECT version FROM objects WHERE object_id = ?1",
                    [object_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(from_rusqlite)?;
            // dropping tx rolls back
            return Ok(CommitOutcome::Conflict {
                expected: expected_version,
                actual: actual.map(from_sql_version).transpose()?,
            });
        }

        record_commit(&tx, object_id, new_sql, &payload, now)?;

        match tx.commit() {
            Ok(()) => {
                tracing::debug!(
                    object_id = object_id,
                    base_version = expected_version,
                    new_version = new_version,
                    "SQLite store committed"
                );
                Ok(CommitOutcome::Committed {
                    version: new_version,
                })
            }
            Err(err) => {
                tracing::warn!(
                    object_id = object_id,
                    base_version = expected_version,
                    error = %err,
                    "SQLite commit did not acknowledge"
                );
                Ok(CommitOutcome::Unknown {
                    reason: err.to_string(),
                })
            }
        }
    }
}

fn record_commit(
    tx: &rusqlite::Transaction<'_>,
    object_id: &str,
    version: i64,
    payload: &str,
    committed_at: i64,
) -> Result<()> {
    let digest = hex::encode(Sha256::digest(payload.as_bytes()));
    tx.execute(
        "INSERT INTO commit_log (object_id, version, payload_digest, committed_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![object_id, version, digest, committed_at],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

fn to_sql_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| StoreError::VersionOutOfRange(version.to_string()).into())
}

fn from_sql_version(version: i64) -> Result<u64> {
    u64::try_from(version).map_err(|_| StoreError::VersionOutOfRange(version.to_string()).into())
}
