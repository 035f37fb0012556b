//! Stagehand Store - reference versioned stores
//!
//! Provides:
//! - [`MemoryStore`]: in-process map of versioned objects
//! - [`SqliteStore`]: SQLite persistence with embedded migrations and a commit log
//! - [`FaultInjectingStore`]: wrapper that simulates conflicts and lost replies

pub mod db;
pub mod errors;
pub mod faults;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export key types
pub use errors::{Result, StoreError};
pub use faults::{Fault, FaultInjectingStore};
pub use memory::MemoryStore;
pub use sqlite::{CommitRecord, SqliteStore};
