//! Staged Commit Demonstration
//!
//! Walks through the lifecycle of staged table updates against a SQLite
//! store:
//! 1. Fail-slow builders that report every mistake at once
//! 2. Dry-run `apply()` versus `commit()`
//! 3. A stale handle losing a race, then winning on retry
//! 4. An ambiguous outcome resolved by reading back
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use stagehand_core::logging_facility::{init, Profile};
use stagehand_core::{ErrorKind, PendingUpdate, PendingUpdateTyped};
use stagehand_engine::{Table, TableMetadata, FORMAT_VERSION_KEY};
use stagehand_store::{Fault, FaultInjectingStore, SqliteStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);
    println!("=== Stagehand Commit Demo ===\n");

    let store = Arc::new(SqliteStore::open_in_memory()?);
    store.create(
        "db.events",
        &TableMetadata::new("mem://warehouse/events").with_property("owner", "ingest"),
    )?;
    let table = Table::load(store.clone(), "db.events")?;
    println!("Loaded db.events at version {}\n", table.version());

    // ===== Part 1: Fail-slow validation =====
    println!("## Part 1: Fail-slow validation\n");

    let mut update = table.update_properties();
    update.set("", "x").set(FORMAT_VERSION_KEY, "7").set("a", "1").remove("a");
    match update.apply() {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!("apply() rejected the update:\n{}", err.message()),
    }

    // ===== Part 2: Dry run, then commit =====
    println!("## Part 2: Dry run, then commit\n");

    let mut update = table.update_properties();
    update.set("retention-days", "30").set(FORMAT_VERSION_KEY, "2");
    let preview = update.apply()?;
    println!(
        "Preview: format v{} with {} properties (store still at version {})",
        preview.format_version,
        preview.properties.len(),
        table.version()
    );
    update.commit()?;
    println!("✓ Committed, table now at version {}\n", table.version());

    // ===== Part 3: Losing and winning a race =====
    println!("## Part 3: Optimistic concurrency\n");

    let stale = Table::load(store.clone(), "db.events")?;
    let mut winner = table.update_properties();
    winner.set("writer", "first");
    winner.commit()?;

    let mut loser = stale.update_properties();
    loser.set("reader", "second");
    let err = loser.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    println!("Stale handle: {}", err);

    let mut retrying = stale.update_properties();
    retrying.set("reader", "second");
    let mut tx = stale.new_transaction()?;
    tx.add(retrying);
    tx.commit()?;
    println!("✓ Retried through a transaction, version {}\n", stale.version());

    // ===== Part 4: Ambiguous outcome =====
    println!("## Part 4: Unknown commit state\n");

    let flaky = Arc::new(FaultInjectingStore::new(SqliteStore::open_in_memory()?));
    flaky
        .inner()
        .create("db.audit", &TableMetadata::new("mem://warehouse/audit"))?;
    flaky.inject(Fault::LostAcknowledgement);
    let audit = Table::load(flaky.clone(), "db.audit")?;

    let mut update = audit.update_location();
    update.set_location("mem://warehouse/audit_v2");
    let err = update.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommitStateUnknown);
    println!("Commit reported: {}", err);

    let latest = audit.refresh()?;
    println!(
        "Read-back: version {} at {}",
        latest.version, latest.value.location
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}
