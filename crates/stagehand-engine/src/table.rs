//! Table handle
//!
//! A [`Table`] pairs an object id with a store and a cached view of the last
//! metadata version it saw. Clones share the cache, so an update committed
//! through one clone is visible to the others without a reload.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use stagehand_core::{log_op_end, log_op_error, log_op_start};
use stagehand_core::{CommitOutcome, Result, RetryPolicy, Transaction, Versioned, VersionedStore};
use stagehand_core_types::RequestContext;

use crate::metadata::TableMetadata;
use crate::update_location::UpdateLocation;
use crate::update_properties::UpdateProperties;

pub struct Table<S> {
    id: String,
    store: Arc<S>,
    view: Arc<Mutex<Versioned<TableMetadata>>>,
}

impl<S> Clone for Table<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            store: Arc::clone(&self.store),
            view: Arc::clone(&self.view),
        }
    }
}

impl<S> Table<S>
where
    S: VersionedStore<TableMetadata>,
{
    /// Read the current metadata of `id` from `store`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the table does not exist, or the store's
    /// error when the read fails.
    pub fn load(store: Arc<S>, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let current = store.load(&id)?;
        tracing::debug!(object_id = %id, version = current.version, "Loaded table");
        Ok(Self {
            id,
            store,
            view: Arc::new(Mutex::new(current)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Metadata as of the cached version
    pub fn metadata(&self) -> TableMetadata {
        self.view().value.clone()
    }

    pub fn version(&self) -> u64 {
        self.view().version
    }

    pub fn current(&self) -> Versioned<TableMetadata> {
        self.view().clone()
    }

    /// Re-read the metadata from the store and advance the cached view
    ///
    /// After a `CommitStateUnknown` this is how a caller finds out whether
    /// the write landed. The view never moves back: if another clone already
    /// cached a newer version, that one is kept.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the cached view is left unchanged.
    pub fn refresh(&self) -> Result<Versioned<TableMetadata>> {
        let latest = self.store.load(&self.id)?;
        self.advance_view(latest.clone());
        Ok(latest)
    }

    /// Stage property changes against this table
    pub fn update_properties(&self) -> UpdateProperties<S> {
        UpdateProperties::new(self.clone())
    }

    /// Stage a location change against this table
    pub fn update_location(&self) -> UpdateLocation<S> {
        UpdateLocation::new(self.clone())
    }

    /// Retry policy configured by the table's `commit.retry.*` properties
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` when a retry property is malformed.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        self.view().value.retry_policy()
    }

    /// Empty transaction that retries with this table's policy
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` when a retry property is malformed.
    pub fn new_transaction(&self) -> Result<Transaction> {
        let retry = self.retry_policy()?;
        Ok(Transaction::with_context(RequestContext::new()).with_retry_policy(retry))
    }

    /// Derive new metadata from the cached view and swap it in
    ///
    /// Returns the committed version. On a conflict the view is refreshed so
    /// the next attempt derives from the winner's metadata; on an unknown
    /// outcome the view is left alone.
    pub(crate) fn commit_with<F>(&self, op: &'static str, derive: F) -> Result<u64>
    where
        F: FnOnce(&TableMetadata) -> Result<TableMetadata>,
    {
        let start = Instant::now();
        let base = self.current();
        log_op_start!(op, object_id = %self.id, base_version = base.version);

        match self.swap(base, derive) {
            Ok(version) => {
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    object_id = %self.id,
                    new_version = version
                );
                Ok(version)
            }
            Err(err) => {
                let err = match err.op() {
                    Some(_) => err,
                    None => err.with_op(op),
                };
                let err = match err.object_id() {
                    Some(_) => err,
                    None => err.with_object_id(self.id.clone()),
                };
                log_op_error!(
                    op,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    object_id = %self.id
                );
                Err(err)
            }
        }
    }

    fn swap<F>(&self, base: Versioned<TableMetadata>, derive: F) -> Result<u64>
    where
        F: FnOnce(&TableMetadata) -> Result<TableMetadata>,
    {
        let next = derive(&base.value)?;

        match self.store.compare_and_swap(&self.id, base.version, &next)? {
            CommitOutcome::Committed { version } => {
                self.advance_view(Versioned::new(version, next));
                Ok(version)
            }
            outcome @ CommitOutcome::Conflict { .. } => {
                if let Err(err) = self.refresh() {
                    tracing::warn!(
                        object_id = %self.id,
                        err_code = err.code(),
                        "Refresh after conflict failed"
                    );
                }
                outcome.into_status().map(|()| base.version)
            }
            outcome @ CommitOutcome::Unknown { .. } => outcome.into_status().map(|()| base.version),
        }
    }
}

impl<S> Table<S> {
    fn view(&self) -> MutexGuard<'_, Versioned<TableMetadata>> {
        // the view is a cache; a panic mid-write leaves a stale but whole value
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the cached view only with a strictly newer version
    fn advance_view(&self, latest: Versioned<TableMetadata>) {
        let mut view = self.view();
        if latest.version > view.version {
            *view = latest;
        } else {
            tracing::debug!(
                object_id = %self.id,
                cached_version = view.version,
                incoming_version = latest.version,
                "Kept newer cached view"
            );
        }
    }
}

impl<S> std::fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("view", &*self.view())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::ErrorKind;
    use stagehand_store::{Fault, FaultInjectingStore, MemoryStore};

    type Hook = Box<dyn FnOnce()>;

    /// Runs a hook after the inner write succeeds, before the caller sees it
    struct RacingStore {
        inner: Arc<MemoryStore<TableMetadata>>,
        after_write: Mutex<Option<Hook>>,
    }

    impl VersionedStore<TableMetadata> for RacingStore {
        fn load(&self, object_id: &str) -> Result<Versioned<TableMetadata>> {
            self.inner.load(object_id)
        }

        fn compare_and_swap(
            &self,
            object_id: &str,
            expected_version: u64,
            value: &TableMetadata,
        ) -> Result<CommitOutcome> {
            let outcome = self.inner.compare_and_swap(object_id, expected_version, value)?;
            let hook = self.after_write.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            Ok(outcome)
        }
    }

    fn memory_table() -> (Arc<MemoryStore<TableMetadata>>, Table<MemoryStore<TableMetadata>>) {
        let store = Arc::new(MemoryStore::new());
        store.create("db.events", TableMetadata::new("mem://events")).unwrap();
        let table = Table::load(store.clone(), "db.events").unwrap();
        (store, table)
    }

    #[test]
    fn test_load_missing_table() {
        let store: Arc<MemoryStore<TableMetadata>> = Arc::new(MemoryStore::new());
        let err = Table::load(store, "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_commit_with_updates_shared_view() {
        let (_store, table) = memory_table();
        let other = table.clone();

        let version = table
            .commit_with("test.commit", |base| Ok(base.clone().with_property("k", "v")))
            .unwrap();

        assert_eq!(version, 2);
        assert_eq!(other.version(), 2);
        assert_eq!(other.metadata().property("k"), Some("v"));
    }

    #[test]
    fn test_conflict_refreshes_view() {
        let (store, table) = memory_table();
        store
            .compare_and_swap("db.events", 1, &TableMetadata::new("mem://moved"))
            .unwrap();

        let err = table
            .commit_with("test.commit", |base| Ok(base.clone()))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitFailed);
        assert_eq!(err.object_id(), Some("db.events"));
        assert_eq!(table.version(), 2);
        assert_eq!(table.metadata().location, "mem://moved");
    }

    #[test]
    fn test_unknown_leaves_view_alone() {
        let inner = MemoryStore::new();
        inner.create("db.events", TableMetadata::new("mem://events")).unwrap();
        let store = Arc::new(FaultInjectingStore::new(inner));
        store.inject(Fault::LostAcknowledgement);
        let table = Table::load(store, "db.events").unwrap();

        let err = table
            .commit_with("test.commit", |base| Ok(base.clone().with_property("k", "v")))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitStateUnknown);
        assert_eq!(table.version(), 1);
        assert_eq!(table.refresh().unwrap().version, 2);
    }

    #[test]
    fn test_late_commit_does_not_roll_back_shared_view() {
        // Given: a third writer lands v3 and another clone caches it before
        // our v2 acknowledgement is processed
        let inner = Arc::new(MemoryStore::new());
        inner.create("db.events", TableMetadata::new("mem://events")).unwrap();
        let store = Arc::new(RacingStore {
            inner: inner.clone(),
            after_write: Mutex::new(None),
        });
        let table = Table::load(store.clone(), "db.events").unwrap();
        let other = table.clone();
        let third = inner.clone();
        *store.after_write.lock().unwrap() = Some(Box::new(move || {
            third
                .compare_and_swap(
                    "db.events",
                    2,
                    &TableMetadata::new("mem://events").with_property("writer", "third"),
                )
                .unwrap();
            other.refresh().unwrap();
        }));

        // When
        let version = table
            .commit_with("test.commit", |base| Ok(base.clone().with_property("k", "v")))
            .unwrap();

        // Then: our commit reports v2 but the shared view stays at v3
        assert_eq!(version, 2);
        assert_eq!(inner.load("db.events").unwrap().version, 3);
        assert_eq!(table.version(), 3);
        assert_eq!(table.metadata().property("writer"), Some("third"));

        // And: the next commit derives from v3 without a conflict
        let next = table
            .commit_with("test.commit", |base| Ok(base.clone().with_property("n", "1")))
            .unwrap();
        assert_eq!(next, 4);
    }

    #[test]
    fn test_refresh_keeps_newer_view() {
        let (store, table) = memory_table();
        table
            .commit_with("test.commit", |base| Ok(base.clone().with_property("k", "v")))
            .unwrap();
        let stale = Versioned::new(1, TableMetadata::new("mem://events"));

        table.advance_view(stale);

        assert_eq!(table.version(), 2);
        assert_eq!(table.refresh().unwrap(), store.load("db.events").unwrap());
        assert_eq!(table.metadata().property("k"), Some("v"));
    }
}
