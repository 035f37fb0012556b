//! Canonical event names for structured logging
//!
//! Every `log_op_*` macro tags its event with one of these, so operation
//! boundaries can be matched across crates without string literals.

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
