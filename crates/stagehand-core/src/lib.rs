//! Stagehand Core - staged-mutation protocol
//!
//! This crate provides the contract every staged change to a versioned,
//! externally stored object goes through:
//! - A fail-slow validation accumulator ([`ErrorCollector`]) for fluent builders
//! - The untyped [`PendingUpdate`] handle and the typed [`PendingUpdateTyped`] lifecycle
//! - The external store boundary ([`VersionedStore`]) with its three-way [`CommitOutcome`]
//! - A bounded [`RetryPolicy`] and an ordered [`Transaction`] aggregator
//! - The structured error and logging facilities shared by the workspace

pub mod collector;
pub mod errors;
pub mod logging_facility;
pub mod pending_update;
pub mod retry;
pub mod store;
pub mod transaction;

// Re-export commonly used types
pub use collector::ErrorCollector;
pub use errors::{ErrorKind, Result, StagedError, Status};
pub use pending_update::{PendingUpdate, PendingUpdateTyped};
pub use retry::RetryPolicy;
pub use store::{CommitOutcome, Versioned, VersionedStore};
pub use transaction::Transaction;
