//! Staged-update lifecycle: propose, validate, apply, commit
//!
//! [`PendingUpdate`] is the untyped handle an aggregator stores and commits.
//! [`PendingUpdateTyped`] adds the dry-run `apply()` with a concrete result
//! type and gives every implementor one owned [`ErrorCollector`].
//!
//! ## Commit protocol
//!
//! 1. Recorded errors → `ValidationFailed`, the store is never contacted
//! 2. Otherwise the change is submitted against a known base version
//! 3. The store replies with exactly one of:
//!    - success → `Ok(())`, the caller's view moves to the new version
//!    - conflict → `CommitFailed`, retry only after re-deriving from fresh state
//!    - ambiguous → `CommitStateUnknown`, never retried automatically
//!
//! ## Example
//!
//! ```
//! use stagehand_core::{ErrorCollector, ErrorKind, PendingUpdate, PendingUpdateTyped, Result, Status};
//!
//! #[derive(Default)]
//! struct Rename {
//!     name: String,
//!     errors: ErrorCollector,
//! }
//!
//! impl Rename {
//!     fn set_name(&mut self, name: &str) -> &mut Self {
//!         if name.is_empty() {
//!             self.add_error(ErrorKind::InvalidArgument, "Name cannot be empty");
//!             return self;
//!         }
//!         self.name = name.to_string();
//!         self
//!     }
//! }
//!
//! impl PendingUpdate for Rename {
//!     fn commit(&mut self) -> Status {
//!         self.check_errors()
//!     }
//! }
//!
//! impl PendingUpdateTyped for Rename {
//!     type Output = String;
//!
//!     fn apply(&self) -> Result<String> {
//!         self.check_errors()?;
//!         Ok(self.name.clone())
//!     }
//!
//!     fn collector(&self) -> &ErrorCollector {
//!         &self.errors
//!     }
//!
//!     fn collector_mut(&mut self) -> &mut ErrorCollector {
//!         &mut self.errors
//!     }
//! }
//!
//! let mut update = Rename::default();
//! update.set_name("").set_name("orders");
//! assert_eq!(update.apply().unwrap_err().kind(), ErrorKind::ValidationFailed);
//! ```

use crate::collector::ErrorCollector;
use crate::errors::{ErrorKind, Result, StagedError, Status};

/// Untyped handle over any staged update
///
/// Lets a heterogeneous collection of updates (different result types) be
/// held and committed through one interface. Committing through this trait
/// behaves exactly like committing the concrete value.
pub trait PendingUpdate {
    /// Apply and commit the pending changes to the external store
    ///
    /// # Errors
    ///
    /// - `ValidationFailed`: recorded or semantic validation errors
    /// - `CommitFailed`: the base version was stale; re-derive and retry
    /// - `CommitStateUnknown`: the outcome could not be determined
    /// - collaborator kinds (e.g. `Io`, `Persistence`) passed through verbatim
    fn commit(&mut self) -> Status;
}

impl<U: PendingUpdate + ?Sized> PendingUpdate for Box<U> {
    fn commit(&mut self) -> Status {
        (**self).commit()
    }
}

/// Typed staged update with a side-effect-free preview
///
/// Builder methods on implementors record errors through [`add_error`] and
/// keep returning `&mut Self`; `apply()` and `commit()` must call
/// [`check_errors`] before any other work.
///
/// [`add_error`]: PendingUpdateTyped::add_error
/// [`check_errors`]: PendingUpdateTyped::check_errors
pub trait PendingUpdateTyped: PendingUpdate {
    /// Value produced by `apply()`
    type Output;

    /// Compute the value that would be committed, without committing it
    ///
    /// # Errors
    ///
    /// - `ValidationFailed`: pending changes cannot be applied
    /// - `InvalidArgument`: pending changes conflict with each other
    fn apply(&self) -> Result<Self::Output>;

    /// The accumulator owned by this update
    fn collector(&self) -> &ErrorCollector;

    fn collector_mut(&mut self) -> &mut ErrorCollector;

    /// Record a validation error to be returned by `apply()` / `commit()`
    fn add_error(&mut self, kind: ErrorKind, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.collector_mut().add_error(kind, message);
    }

    /// Record an error produced by another component
    fn add_existing_error(&mut self, err: StagedError) {
        self.collector_mut().add_existing_error(err);
    }

    fn has_errors(&self) -> bool {
        self.collector().has_errors()
    }

    /// # Errors
    ///
    /// Returns the aggregate `ValidationFailed` error when anything was recorded.
    fn check_errors(&self) -> Status {
        self.collector().check_errors()
    }

    fn clear_errors(&mut self) {
        self.collector_mut().clear_errors();
    }
}
