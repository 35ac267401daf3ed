//! Concurrency tests for the snapshot store.
//!
//! This test file verifies:
//! - The per-developer capacity holds under concurrent captures
//! - Readers never observe expired snapshots while a sweep runs
//! - Different developers proceed independently

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, Utc};
use refocus_core::{MemoryBackend, PriorityScorer, SnapshotBackend, SnapshotStore, WorkContextDraft};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T15:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_capacity_holds_under_concurrent_puts() {
    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(SnapshotStore::new(backend.clone(), PriorityScorer::new(), 5));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    let ctx = WorkContextDraft::new("dev", "proj").capture(now()).unwrap();
                    store.put(ctx, now()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list_by_developer("dev", None, now()).unwrap().len(), 5);
    assert_eq!(backend.len(), 5);
}

#[test]
fn test_developers_are_independent() {
    let store = Arc::new(SnapshotStore::new(
        Arc::new(MemoryBackend::new()),
        PriorityScorer::new(),
        3,
    ));

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let developer = format!("dev-{n}");
                for _ in 0..10 {
                    let ctx = WorkContextDraft::new(developer.as_str(), "proj")
                        .capture(now())
                        .unwrap();
                    store.put(ctx, now()).unwrap();
                }
                store.list_by_developer(&developer, None, now()).unwrap().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

#[test]
fn test_readers_never_see_expired_during_sweep() {
    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(SnapshotStore::new(backend.clone(), PriorityScorer::new(), 1000));

    for n in 0..200 {
        let captured_at = if n % 2 == 0 {
            now() - Duration::days(8)
        } else {
            now()
        };
        let ctx = WorkContextDraft {
            captured_at: Some(captured_at),
            ..WorkContextDraft::new(format!("dev-{}", n % 4), "proj")
        }
        .capture(now())
        .unwrap();
        backend.put(&ctx).unwrap();
    }

    let sweeper = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.sweep_expired(now()).unwrap())
    };
    let readers: Vec<_> = (0..4)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..20 {
                    let listed = store.list_by_developer(&format!("dev-{n}"), None, now()).unwrap();
                    assert!(listed.iter().all(|c| !c.is_expired(now())));
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(sweeper.join().unwrap(), 100);
    assert_eq!(backend.len(), 100);
}
