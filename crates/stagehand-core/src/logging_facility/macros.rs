//! Canonical logging macros
//!
//! These macros keep operation boundaries uniform across crates. Callers
//! must depend on `stagehand-core-types` for the event constants.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use stagehand_core::log_op_start;
/// log_op_start!("update_properties.commit");
/// log_op_start!("update_properties.commit", object_id = "db.events");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use stagehand_core::log_op_end;
/// log_op_end!("update_properties.commit", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// `$err` must be a `StagedError` (or a reference to one).
///
/// # Example
///
/// ```
/// # use stagehand_core::{log_op_error, StagedError};
/// let err = StagedError::commit_failed("stale base");
/// log_op_error!("update_properties.commit", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let staged_err: &$crate::errors::StagedError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?staged_err.kind(),
            err_code = staged_err.code(),
            err_message = staged_err.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let staged_err: &$crate::errors::StagedError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = stagehand_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?staged_err.kind(),
            err_code = staged_err.code(),
            err_message = staged_err.message(),
            $($field)*
        );
    }};
}
