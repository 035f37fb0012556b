//! Error handling for stagehand-store
//!
//! Store-internal failures are modeled by [`StoreError`] and converted into
//! the workspace-wide `StagedError` at the crate boundary.

use stagehand_core::{ErrorKind, StagedError};
use thiserror::Error;

/// Result type alias using StagedError
pub type Result<T> = stagehand_core::Result<T>;

/// Failures raised inside a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("version {0} is out of range")]
    VersionOutOfRange(String),

    #[error("Migration {migration_id} failed: {reason}")]
    Migration {
        migration_id: String,
        reason: String,
    },

    #[error("Checksum mismatch for migration {migration_id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        migration_id: String,
        expected: String,
        actual: String,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Sqlite(_) | StoreError::Migration { .. } => ErrorKind::Persistence,
            StoreError::ChecksumMismatch { .. } => ErrorKind::Persistence,
            StoreError::Json(_) => ErrorKind::Serialization,
            StoreError::LockPoisoned | StoreError::VersionOutOfRange(_) => ErrorKind::Internal,
        }
    }

    fn op(&self) -> &'static str {
        match self {
            StoreError::Sqlite(_) => "sqlite",
            StoreError::Json(_) => "payload_codec",
            StoreError::LockPoisoned => "store_lock",
            StoreError::VersionOutOfRange(_) => "version_conversion",
            StoreError::Migration { .. } => "migration",
            StoreError::ChecksumMismatch { .. } => "migration_checksum",
        }
    }
}

impl From<StoreError> for StagedError {
    fn from(err: StoreError) -> Self {
        StagedError::new(err.kind())
            .with_op(err.op())
            .with_message(err.to_string())
    }
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> StagedError {
    StoreError::from(err).into()
}

/// Create a serialization error from serde_json::Error
pub fn from_json(err: serde_json::Error) -> StagedError {
    StoreError::from(err).into()
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> StagedError {
    StoreError::Migration {
        migration_id: migration_id.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> StagedError {
    StoreError::ChecksumMismatch {
        migration_id: migration_id.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
    .into()
}

/// Create a not-found error for a missing object
pub fn object_not_found(op: &str, object_id: &str) -> StagedError {
    StagedError::new(ErrorKind::NotFound)
        .with_op(op.to_string())
        .with_object_id(object_id.to_string())
        .with_message(format!("Object not found: {}", object_id))
}

/// Create an already-exists error for a duplicate object
pub fn object_exists(op: &str, object_id: &str) -> StagedError {
    StagedError::new(ErrorKind::AlreadyExists)
        .with_op(op.to_string())
        .with_object_id(object_id.to_string())
        .with_message(format!("Object already exists: {}", object_id))
}

/// Map a poisoned lock onto an internal error
pub fn lock_poisoned() -> StagedError {
    StoreError::LockPoisoned.into()
}
