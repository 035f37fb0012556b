//! Staged change of a table's base location

use stagehand_core::{
    ErrorCollector, ErrorKind, PendingUpdate, PendingUpdateTyped, Result, StagedError, Status,
    VersionedStore,
};

use crate::metadata::TableMetadata;
use crate::table::Table;

const OP_COMMIT: &str = "update_location.commit";

pub struct UpdateLocation<S> {
    table: Table<S>,
    location: Option<String>,
    committed: bool,
    errors: ErrorCollector,
}

impl<S> UpdateLocation<S>
where
    S: VersionedStore<TableMetadata>,
{
    pub fn new(table: Table<S>) -> Self {
        Self {
            table,
            location: None,
            committed: false,
            errors: ErrorCollector::new(),
        }
    }

    pub fn set_location(&mut self, location: impl Into<String>) -> &mut Self {
        let location = location.into();
        if self.committed {
            self.add_error(
                ErrorKind::InvalidArgument,
                "Update already committed; stage further changes on a new update",
            );
            return self;
        }
        if location.trim().is_empty() {
            self.add_error(ErrorKind::InvalidArgument, "Location cannot be empty");
            return self;
        }
        self.location = Some(location);
        self
    }

    fn staged_location(&self) -> Result<&str> {
        self.location
            .as_deref()
            .ok_or_else(|| StagedError::validation_failed("Location must be set before apply"))
    }
}

impl<S> PendingUpdate for UpdateLocation<S>
where
    S: VersionedStore<TableMetadata>,
{
    fn commit(&mut self) -> Status {
        if self.committed {
            return self.check_errors();
        }

        let this = &*self;
        this.table.commit_with(OP_COMMIT, |base| {
            let location = this.apply()?;
            Ok(TableMetadata {
                location,
                ..base.clone()
            })
        })?;

        self.committed = true;
        Ok(())
    }
}

impl<S> PendingUpdateTyped for UpdateLocation<S>
where
    S: VersionedStore<TableMetadata>,
{
    type Output = String;

    fn apply(&self) -> Result<String> {
        self.check_errors()?;
        self.staged_location().map(str::to_string)
    }

    fn collector(&self) -> &ErrorCollector {
        &self.errors
    }

    fn collector_mut(&mut self) -> &mut ErrorCollector {
        &mut self.errors
    }
}
