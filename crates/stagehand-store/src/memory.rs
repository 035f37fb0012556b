//! In-process versioned store
//!
//! Holds every object behind one mutex. Useful for tests and for embedding
//! the protocol without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use stagehand_core::{CommitOutcome, Versioned, VersionedStore};

use crate::errors::{lock_poisoned, object_exists, object_not_found, Result};

pub struct MemoryStore<T> {
    objects: Mutex<HashMap<String, Versioned<T>>>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a new object at version 1
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when `object_id` is taken.
    pub fn create(&self, object_id: &str, value: T) -> Result<u64> {
        let mut objects = self.lock()?;
        if objects.contains_key(object_id) {
            return Err(object_exists("memory_store.create", object_id));
        }
        objects.insert(object_id.to_string(), Versioned::new(1, value));
        Ok(1)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Versioned<T>>>> {
        self.objects.lock().map_err(|_| lock_poisoned())
    }
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> VersionedStore<T> for MemoryStore<T> {
    fn load(&self, object_id: &str) -> Result<Versioned<T>> {
        self.lock()?
            .get(object_id)
            .cloned()
            .ok_or_else(|| object_not_found("memory_store.load", object_id))
    }

    fn compare_and_swap(
        &self,
        object_id: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<CommitOutcome> {
        let mut objects = self.lock()?;
        let Some(current) = objects.get_mut(object_id) else {
            return Ok(CommitOutcome::Conflict {
                expected: expected_version,
                actual: None,
            });
        };

        if current.version != expected_version {
            return Ok(CommitOutcome::Conflict {
                expected: expected_version,
                actual: Some(current.version),
            });
        }

        current.version += 1;
        current.value = value.clone();
        tracing::debug!(
            object_id = object_id,
            new_version = current.version,
            "Memory store committed"
        );
        Ok(CommitOutcome::Committed {
            version: current.version,
        })
    }
}
