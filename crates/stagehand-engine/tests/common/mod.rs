use std::sync::Arc;

use stagehand_core::RetryPolicy;
use stagehand_engine::{Table, TableMetadata};
use stagehand_store::{FaultInjectingStore, MemoryStore, SqliteStore};

pub type MemoryTable = Table<MemoryStore<TableMetadata>>;
pub type FaultyStore = FaultInjectingStore<MemoryStore<TableMetadata>>;

pub fn base_metadata() -> TableMetadata {
    TableMetadata::new("mem://warehouse/events").with_property("owner", "ingest")
}

/// Memory-backed table at version 1
#[allow(dead_code)]
pub fn memory_table(id: &str) -> (Arc<MemoryStore<TableMetadata>>, MemoryTable) {
    let store = Arc::new(MemoryStore::new());
    store.create(id, base_metadata()).unwrap();
    let table = Table::load(store.clone(), id).unwrap();
    (store, table)
}

/// In-memory SQLite table at version 1
#[allow(dead_code)]
pub fn sqlite_table(id: &str) -> (Arc<SqliteStore>, Table<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.create(id, &base_metadata()).unwrap();
    let table = Table::load(store.clone(), id).unwrap();
    (store, table)
}

/// Memory-backed table behind a fault injector
#[allow(dead_code)]
pub fn faulty_table(id: &str) -> (Arc<FaultyStore>, Table<FaultyStore>) {
    let inner = MemoryStore::new();
    inner.create(id, base_metadata()).unwrap();
    let store = Arc::new(FaultInjectingStore::new(inner));
    let table = Table::load(store.clone(), id).unwrap();
    (store, table)
}

/// Retry policy with no waiting between attempts
#[allow(dead_code)]
pub fn instant_retries(num_retries: u32) -> RetryPolicy {
    RetryPolicy {
        num_retries,
        min_wait_ms: 0,
        max_wait_ms: 0,
        total_timeout_ms: 10_000,
    }
}
