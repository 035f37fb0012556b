//! Staged property changes
//!
//! ```
//! use std::sync::Arc;
//! use stagehand_core::{PendingUpdate, PendingUpdateTyped};
//! use stagehand_engine::{Table, TableMetadata};
//! use stagehand_store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.create("db.events", TableMetadata::new("mem://events")).unwrap();
//! let table = Table::load(store, "db.events").unwrap();
//!
//! let mut update = table.update_properties();
//! update.set("owner", "analytics").remove("stale");
//! assert_eq!(update.apply().unwrap().property("owner"), Some("analytics"));
//!
//! update.commit().unwrap();
//! assert_eq!(table.version(), 2);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use stagehand_core::retry::{
    COMMIT_MAX_RETRY_WAIT_MS, COMMIT_MIN_RETRY_WAIT_MS, COMMIT_NUM_RETRIES,
    COMMIT_TOTAL_RETRY_TIME_MS,
};
use stagehand_core::{
    ErrorCollector, ErrorKind, PendingUpdate, PendingUpdateTyped, Result, Status, VersionedStore,
};

use crate::metadata::{TableMetadata, FORMAT_VERSION_KEY, SUPPORTED_FORMAT_VERSION};
use crate::table::Table;

const OP_COMMIT: &str = "update_properties.commit";
const ALREADY_COMMITTED: &str = "Update already committed; stage further changes on a new update";

const RETRY_KEYS: [&str; 4] = [
    COMMIT_NUM_RETRIES,
    COMMIT_MIN_RETRY_WAIT_MS,
    COMMIT_MAX_RETRY_WAIT_MS,
    COMMIT_TOTAL_RETRY_TIME_MS,
];

/// Property sets and removals staged against one table
pub struct UpdateProperties<S> {
    table: Table<S>,
    updates: BTreeMap<String, String>,
    removals: BTreeSet<String>,
    format_version: Option<u32>,
    committed: bool,
    errors: ErrorCollector,
}

impl<S> UpdateProperties<S>
where
    S: VersionedStore<TableMetadata>,
{
    pub fn new(table: Table<S>) -> Self {
        Self {
            table,
            updates: BTreeMap::new(),
            removals: BTreeSet::new(),
            format_version: None,
            committed: false,
            errors: ErrorCollector::new(),
        }
    }

    /// Stage `key = value`
    ///
    /// `format-version` is not stored: it requests a format upgrade instead.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();

        if self.committed {
            self.add_error(ErrorKind::InvalidArgument, ALREADY_COMMITTED);
            return self;
        }
        if key.is_empty() {
            self.add_error(ErrorKind::InvalidArgument, "Property key cannot be empty");
            return self;
        }
        if self.removals.contains(&key) {
            self.add_error(
                ErrorKind::InvalidArgument,
                format!("Cannot remove and update the same key: {}", key),
            );
            return self;
        }
        if key == FORMAT_VERSION_KEY {
            self.stage_format_version(&value);
            return self;
        }
        if RETRY_KEYS.contains(&key.as_str()) && value.trim().parse::<u64>().is_err() {
            self.add_error(
                ErrorKind::InvalidArgument,
                format!("Invalid value for {}: '{}'", key, value),
            );
            return self;
        }

        self.updates.insert(key, value);
        self
    }

    /// Stage removal of `key`; removing an absent key is not an error
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();

        if self.committed {
            self.add_error(ErrorKind::InvalidArgument, ALREADY_COMMITTED);
            return self;
        }
        if key.is_empty() {
            self.add_error(ErrorKind::InvalidArgument, "Property key cannot be empty");
            return self;
        }
        if key == FORMAT_VERSION_KEY {
            self.add_error(
                ErrorKind::InvalidArgument,
                format!("Cannot remove reserved property: {}", FORMAT_VERSION_KEY),
            );
            return self;
        }
        if self.updates.contains_key(&key) {
            self.add_error(
                ErrorKind::InvalidArgument,
                format!("Cannot remove and update the same key: {}", key),
            );
            return self;
        }

        self.removals.insert(key);
        self
    }

    pub fn table(&self) -> &Table<S> {
        &self.table
    }

    fn stage_format_version(&mut self, raw: &str) {
        match raw.trim().parse::<u32>() {
            Ok(0) | Err(_) => self.add_error(
                ErrorKind::InvalidArgument,
                format!("Invalid format version: '{}'", raw),
            ),
            Ok(v) if v > SUPPORTED_FORMAT_VERSION => self.add_error(
                ErrorKind::InvalidArgument,
                format!(
                    "Unsupported format version: {} (maximum is {})",
                    v, SUPPORTED_FORMAT_VERSION
                ),
            ),
            Ok(v) => self.format_version = Some(v),
        }
    }

    /// Apply the staged changes to `base`, checking rules that depend on it
    fn apply_to(&self, base: &TableMetadata) -> Result<TableMetadata> {
        let mut semantic = ErrorCollector::new();
        let mut next = base.clone();

        if let Some(requested) = self.format_version {
            if requested < base.format_version {
                semantic.add_error(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Cannot downgrade format version from {} to {}",
                        base.format_version, requested
                    ),
                );
            } else {
                next.format_version = requested;
            }
        }

        for key in &self.removals {
            next.properties.remove(key);
        }
        for (key, value) in &self.updates {
            next.properties.insert(key.clone(), value.clone());
        }

        if let Err(err) = next.retry_policy() {
            semantic.add_existing_error(err);
        }

        semantic.check_errors()?;
        Ok(next)
    }
}

impl<S> PendingUpdate for UpdateProperties<S>
where
    S: VersionedStore<TableMetadata>,
{
    fn commit(&mut self) -> Status {
        if self.committed {
            return self.check_errors();
        }

        let this = &*self;
        this.table.commit_with(OP_COMMIT, |base| {
            this.check_errors()?;
            this.apply_to(base)
        })?;

        self.committed = true;
        Ok(())
    }
}

impl<S> PendingUpdateTyped for UpdateProperties<S>
where
    S: VersionedStore<TableMetadata>,
{
    type Output = TableMetadata;

    fn apply(&self) -> Result<TableMetadata> {
        self.check_errors()?;
        self.apply_to(&self.table.metadata())
    }

    fn collector(&self) -> &ErrorCollector {
        &self.errors
    }

    fn collector_mut(&mut self) -> &mut ErrorCollector {
        &mut self.errors
    }
}
