//! External store boundary
//!
//! The core never performs a write itself. Concrete updates hand their
//! result to a [`VersionedStore`], which reads the current version of an
//! object and swaps in a new one conditioned on an expected base version.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StagedError, Status};

/// Snapshot of an external object at a specific version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }
}

/// The store's reply to a conditional write
///
/// The three outcomes are kept structurally distinct all the way to the
/// caller: collapsing `Conflict` and `Unknown` would lose the information
/// that decides whether a retry is safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write applied atomically; the object is now at `version`
    Committed { version: u64 },
    /// The base version was stale; nothing was written
    Conflict { expected: u64, actual: Option<u64> },
    /// The write was submitted but whether it applied is not known
    Unknown { reason: String },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// Map the outcome onto the protocol's status
    ///
    /// # Errors
    ///
    /// `Conflict` becomes `CommitFailed`, `Unknown` becomes `CommitStateUnknown`.
    pub fn into_status(self) -> Status {
        match self {
            CommitOutcome::Committed { .. } => Ok(()),
            CommitOutcome::Conflict { expected, actual } => {
                let actual = actual
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".to_string());
                Err(StagedError::commit_failed(format!(
                    "Base version {} is stale: current version is {}",
                    expected, actual
                )))
            }
            CommitOutcome::Unknown { reason } => Err(StagedError::commit_state_unknown(
                format!("Commit state unknown: {}", reason),
            )),
        }
    }
}

/// Versioned external store consumed by `commit()`
///
/// Implementations are expected to be shareable between several handles,
/// hence `&self` receivers; any locking is internal to the store.
pub trait VersionedStore<T> {
    /// Read the current version of an object
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the object does not exist, or a collaborator
    /// kind when the read itself fails.
    fn load(&self, object_id: &str) -> Result<Versioned<T>>;

    /// Atomically replace the object iff it is still at `expected_version`
    ///
    /// On success the object moves to `expected_version + 1`.
    ///
    /// # Errors
    ///
    /// `Err` is reserved for failures that happened before anything was
    /// submitted (codec errors, unreachable backend). Conflicts and ambiguous
    /// outcomes are reported through [`CommitOutcome`].
    fn compare_and_swap(
        &self,
        object_id: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<CommitOutcome>;
}

impl<T, S: VersionedStore<T> + ?Sized> VersionedStore<T> for std::sync::Arc<S> {
    fn load(&self, object_id: &str) -> Result<Versioned<T>> {
        (**self).load(object_id)
    }

    fn compare_and_swap(
        &self,
        object_id: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<CommitOutcome> {
        (**self).compare_and_swap(object_id, expected_version, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_committed_maps_to_ok() {
        assert!(CommitOutcome::Committed { version: 2 }.into_status().is_ok());
    }

    #[test]
    fn test_conflict_maps_to_commit_failed() {
        let err = CommitOutcome::Conflict {
            expected: 1,
            actual: Some(3),
        }
        .into_status()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitFailed);
        assert!(err.message().contains("Base version 1 is stale"));
        assert!(err.message().contains("current version is 3"));
    }

    #[test]
    fn test_unknown_maps_to_commit_state_unknown() {
        let err = CommitOutcome::Unknown {
            reason: "acknowledgement lost".to_string(),
        }
        .into_status()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitStateUnknown);
        assert!(err.message().contains("acknowledgement lost"));
    }

    #[test]
    fn test_versioned_serde_shape() {
        let v = Versioned::new(4, "payload".to_string());
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({"version": 4, "value": "payload"}));
    }
}
