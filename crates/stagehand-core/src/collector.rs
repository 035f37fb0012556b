//! Fail-slow error collection for builder-style staged updates
//!
//! Builder methods return `&mut Self` and therefore cannot report a failure
//! without breaking the call chain. They record into an [`ErrorCollector`]
//! instead, and `apply()` / `commit()` surface every recorded error at once
//! through [`ErrorCollector::check_errors`].
//!
//! ```
//! use stagehand_core::{ErrorCollector, ErrorKind};
//!
//! let mut errors = ErrorCollector::new();
//! errors.add_error(ErrorKind::InvalidArgument, "Value must be non-negative");
//!
//! let err = errors.check_errors().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ValidationFailed);
//! assert!(err.message().contains("Value must be non-negative"));
//! ```

use crate::errors::{ErrorKind, StagedError, Status};

const AGGREGATE_HEADER: &str = "Validation failed due to the following errors:\n";
const AGGREGATE_BULLET: &str = "  - ";

/// Ordered accumulator of validation errors
///
/// Insertion order is preserved in every report. The collector is owned by
/// exactly one staged update and is deliberately not `Clone`.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<StagedError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validation error
    pub fn add_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.errors
            .push(StagedError::new(kind).with_message(message));
    }

    /// Record an error produced elsewhere without rebuilding it
    pub fn add_existing_error(&mut self, err: StagedError) {
        self.errors.push(err);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Check for accumulated errors and return them if any exist
    ///
    /// # Errors
    ///
    /// Returns a single `ValidationFailed` error whose message lists every
    /// recorded message, one bulleted line each, in insertion order.
    pub fn check_errors(&self) -> Status {
        if self.errors.is_empty() {
            return Ok(());
        }

        let mut message = String::from(AGGREGATE_HEADER);
        for err in &self.errors {
            message.push_str(AGGREGATE_BULLET);
            message.push_str(err.message());
            message.push('\n');
        }
        Err(StagedError::validation_failed(message))
    }

    /// Clear all accumulated errors, e.g. when reusing a builder
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Read-only access to the recorded errors, in insertion order
    pub fn errors(&self) -> &[StagedError] {
        &self.errors
    }
}
