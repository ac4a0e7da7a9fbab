//! Concurrency Tests
//!
//! - Concurrent writers lose no updates when they retry on conflict
//! - No reader observes a document without its index entries
//! - A batch is observed entirely or not at all

use seeddb::document::Snapshot;
use seeddb::{
    AcquireOptions, DatabaseConfig, DatabaseHandleRegistry, Document, IndexDescriptor, Predicate,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn registry(root: &TempDir) -> DatabaseHandleRegistry {
    DatabaseHandleRegistry::new(DatabaseConfig::new(root.path()).with_sync_writes(false))
}

fn assert_consistent(snapshot: &Snapshot<'_>) {
    let indexed = snapshot
        .query("desc", &Predicate::matches("entry"))
        .unwrap()
        .ids();
    let stored: Vec<String> = snapshot.ids().map(str::to_string).collect();
    assert_eq!(indexed, stored);

    let by_group = snapshot
        .query("byGroup", &Predicate::at_least(0))
        .unwrap()
        .len();
    assert_eq!(by_group, snapshot.len());
}

/// Read-modify-write with revision checks: every increment lands exactly once.
#[test]
fn test_conditional_increments_lose_nothing() {
    let root = TempDir::new().unwrap();
    let registry = registry(&root);
    let handle = registry.acquire_with("counter", AcquireOptions::new()).unwrap();
    handle
        .put(Document::from_json("c", json!({ "n": 0 })).unwrap())
        .unwrap();
    drop(handle);

    const THREADS: usize = 4;
    const PER_THREAD: u64 = 25;

    let _keep_open = registry.acquire_with("counter", AcquireOptions::new()).unwrap();
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let handle = registry.acquire_with("counter", AcquireOptions::new()).unwrap();
                let mut conflicts = 0u64;
                for _ in 0..PER_THREAD {
                    loop {
                        let mut doc = handle.get("c").unwrap().unwrap();
                        let n = doc.get("n").and_then(|v| v.as_u64()).unwrap();
                        doc.set("n", n + 1);
                        match handle.put(doc) {
                            Ok(_) => break,
                            Err(e) if e.is_conflict() => conflicts += 1,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
                conflicts
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let handle = registry.acquire_with("counter", AcquireOptions::new()).unwrap();
    let doc = handle.get("c").unwrap().unwrap();
    assert_eq!(doc.get("n"), Some(&json!(THREADS as u64 * PER_THREAD)));
    assert_eq!(
        doc.revision().unwrap().generation(),
        1 + THREADS as u64 * PER_THREAD
    );
}

/// Readers racing writers always see documents and indexes in step.
#[test]
fn test_snapshots_never_see_index_lag() {
    let root = TempDir::new().unwrap();
    let registry = registry(&root);
    let options = AcquireOptions::new()
        .index(IndexDescriptor::full_text("desc", ["description"]))
        .index(IndexDescriptor::value("byGroup", ["group"]));
    let handle = registry.acquire_with("race", options.clone()).unwrap();

    const WRITERS: usize = 3;
    const PER_WRITER: usize = 40;
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let registry = registry.clone();
            let options = options.clone();
            thread::spawn(move || {
                let handle = registry.acquire_with("race", options).unwrap();
                for i in 0..PER_WRITER {
                    let id = format!("w{}-{:03}", w, i);
                    handle
                        .put(
                            Document::from_json(
                                id.as_str(),
                                json!({ "description": format!("entry {}", i), "group": w }),
                            )
                            .unwrap(),
                        )
                        .unwrap();
                    if i % 4 == 3 {
                        handle.delete(&id).unwrap();
                    }
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let registry = registry.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let handle = registry.acquire_with("race", AcquireOptions::new()).unwrap();
                let mut checks = 0;
                while !done.load(Ordering::Acquire) || checks == 0 {
                    assert_consistent(&handle.snapshot().unwrap());
                    checks += 1;
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_consistent(&handle.snapshot().unwrap());
    assert_eq!(handle.len().unwrap(), WRITERS * PER_WRITER * 3 / 4);
}

/// A batch is all-or-nothing for readers.
#[test]
fn test_batches_are_observed_whole() {
    let root = TempDir::new().unwrap();
    let registry = registry(&root);
    let handle = registry.acquire_with("batch", AcquireOptions::new()).unwrap();

    let writer = {
        let registry = registry.clone();
        thread::spawn(move || {
            let handle = registry.acquire_with("batch", AcquireOptions::new()).unwrap();
            for round in 0..30 {
                let docs = (0..5)
                    .map(|i| {
                        Document::from_json(format!("r{:02}-{}", round, i), json!({ "round": round }))
                            .unwrap()
                    })
                    .collect();
                handle.put_all(docs).unwrap();
            }
        })
    };

    while !writer.is_finished() {
        assert_eq!(handle.len().unwrap() % 5, 0);
    }
    writer.join().unwrap();
    assert_eq!(handle.len().unwrap(), 150);
}
