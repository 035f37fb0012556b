//! Fault injection around any versioned store
//!
//! Queued faults are consumed one per `compare_and_swap`, in order. With an
//! empty queue every call passes straight through to the wrapped store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use stagehand_core::{CommitOutcome, Versioned, VersionedStore};

use crate::errors::{lock_poisoned, Result};

/// A failure to simulate on the next conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Reject as if another writer had won, without writing
    Conflict,
    /// Write through, then lose the reply
    LostAcknowledgement,
    /// Never reach the store; the caller cannot know that
    Unreachable,
}

pub struct FaultInjectingStore<S> {
    inner: S,
    faults: Mutex<VecDeque<Fault>>,
    attempts: AtomicUsize,
}

impl<S> FaultInjectingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Queue a fault for a future write
    pub fn inject(&self, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push_back(fault);
        }
    }

    pub fn pending_faults(&self) -> usize {
        self.faults.lock().map(|f| f.len()).unwrap_or_default()
    }

    /// Conditional writes received, including faulted ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn next_fault(&self) -> Result<Option<Fault>> {
        Ok(self.faults.lock().map_err(|_| lock_poisoned())?.pop_front())
    }
}

impl<T, S> VersionedStore<T> for FaultInjectingStore<S>
where
    S: VersionedStore<T>,
{
    fn load(&self, object_id: &str) -> Result<Versioned<T>> {
        self.inner.load(object_id)
    }

    fn compare_and_swap(
        &self,
        object_id: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<CommitOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let Some(fault) = self.next_fault()? else {
            return self.inner.compare_and_swap(object_id, expected_version, value);
        };
        tracing::debug!(object_id = object_id, fault = ?fault, "Injecting store fault");

        match fault {
            // reported as if a concurrent writer had just moved the object on
            Fault::Conflict => Ok(CommitOutcome::Conflict {
                expected: expected_version,
                actual: Some(expected_version.saturating_add(1)),
            }),
            Fault::LostAcknowledgement => {
                // whatever the store did, the caller only sees silence
                let _ = self
                    .inner
                    .compare_and_swap(object_id, expected_version, value)?;
                Ok(CommitOutcome::Unknown {
                    reason: "acknowledgement lost".to_string(),
                })
            }
            Fault::Unreachable => Ok(CommitOutcome::Unknown {
                reason: "store unreachable".to_string(),
            }),
        }
    }
}
