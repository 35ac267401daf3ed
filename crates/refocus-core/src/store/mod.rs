//! TTL-aware snapshot store.
//!
//! Snapshots are partitioned by developer. Every operation touching a
//! developer's snapshots runs under that developer's partition lock, so
//! put/get/delete/list/sweep are linearizable per developer while different
//! developers never contend.
//!
//! Expired snapshots are never returned and never count toward capacity. A
//! lookup by id reports them as expired and purges them; listings skip them;
//! [`SnapshotStore::sweep_expired`] removes them in bulk. When a developer
//! exceeds the configured snapshot cap, the lowest-priority snapshot is
//! evicted first (oldest capture breaks ties).

pub mod backend;
pub mod sweeper;

pub use backend::{MemoryBackend, SnapshotBackend};
pub use sweeper::spawn_sweeper;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::context::{PriorityScorer, WorkContext};
use crate::error::CoreError;

/// Default cap on snapshots kept per developer.
pub const DEFAULT_MAX_SNAPSHOTS_PER_DEVELOPER: usize = 20;

/// Outcome of looking up a snapshot by id.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(WorkContext),
    /// Present but past its TTL; purged as part of the lookup
    Expired { id: String, expired_at: DateTime<Utc> },
    Missing { id: String },
}

impl Lookup {
    pub fn into_context(self) -> Option<WorkContext> {
        match self {
            Lookup::Found(context) => Some(context),
            Lookup::Expired { .. } | Lookup::Missing { .. } => None,
        }
    }
}

/// A snapshot paired with its priority at listing time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedContext {
    pub priority: f64,
    pub context: WorkContext,
}

/// Highest priority first, then most recent capture.
fn listing_order(a: &RankedContext, b: &RankedContext) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| b.context.captured_at().cmp(&a.context.captured_at()))
        .then_with(|| a.context.id().cmp(b.context.id()))
}

/// Lowest priority first, then oldest capture.
fn eviction_order(a: &RankedContext, b: &RankedContext) -> Ordering {
    a.priority
        .total_cmp(&b.priority)
        .then_with(|| a.context.captured_at().cmp(&b.context.captured_at()))
        .then_with(|| a.context.id().cmp(b.context.id()))
}

/// Per-developer partitioned snapshot store.
pub struct SnapshotStore {
    backend: Arc<dyn SnapshotBackend>,
    scorer: PriorityScorer,
    max_per_developer: usize,
    partitions: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn SnapshotBackend>, scorer: PriorityScorer, max_per_developer: usize) -> Self {
        Self {
            backend,
            scorer,
            max_per_developer: max_per_developer.max(1),
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Store backed by a fresh [`MemoryBackend`] with default scoring.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBackend::new()),
            PriorityScorer::default(),
            DEFAULT_MAX_SNAPSHOTS_PER_DEVELOPER,
        )
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    pub fn max_per_developer(&self) -> usize {
        self.max_per_developer
    }

    fn partition(&self, developer_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.partitions.read().get(developer_id) {
            return Arc::clone(lock);
        }
        Arc::clone(
            self.partitions
                .write()
                .entry(developer_id.to_string())
                .or_default(),
        )
    }

    /// Insert or overwrite a snapshot, then enforce the per-developer cap.
    ///
    /// Returns the ids evicted to make room (possibly including `context`
    /// itself if it ranks lowest).
    ///
    /// # Errors
    /// Fails with a validation error if the snapshot breaks its invariants,
    /// or a store error if the backend fails.
    pub fn put(&self, context: WorkContext, now: DateTime<Utc>) -> Result<Vec<String>, CoreError> {
        context.validate()?;

        // An id moving between developers leaves the old partition first.
        if let Some(existing) = self.backend.get(context.id())? {
            if existing.developer_id() != context.developer_id() {
                let lock = self.partition(existing.developer_id());
                let _guard = lock.lock();
                self.backend.delete(existing.id())?;
            }
        }

        let lock = self.partition(context.developer_id());
        let _guard = lock.lock();
        self.backend.put(&context)?;
        tracing::debug!(
            id = context.id(),
            developer = context.developer_id(),
            project = context.project_id(),
            "stored work context"
        );
        self.enforce_capacity(context.developer_id(), now)
    }

    /// Look up a snapshot, distinguishing expired from missing.
    pub fn lookup(&self, id: &str, now: DateTime<Utc>) -> Result<Lookup, CoreError> {
        let Some(candidate) = self.backend.get(id)? else {
            return Ok(Lookup::Missing { id: id.to_string() });
        };

        let lock = self.partition(candidate.developer_id());
        let _guard = lock.lock();
        // Re-read under the lock; the record may have changed meanwhile.
        let Some(context) = self.backend.get(id)? else {
            return Ok(Lookup::Missing { id: id.to_string() });
        };

        if context.is_expired(now) {
            self.backend.delete(id)?;
            tracing::debug!(id, expired_at = %context.expires_at(), "purged expired work context on read");
            return Ok(Lookup::Expired {
                id: id.to_string(),
                expired_at: context.expires_at(),
            });
        }
        Ok(Lookup::Found(context))
    }

    /// Valid snapshot by id; expired snapshots read as absent.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<WorkContext>, CoreError> {
        Ok(self.lookup(id, now)?.into_context())
    }

    /// Valid snapshots with their priorities, highest first.
    pub fn list_ranked(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedContext>, CoreError> {
        let lock = self.partition(developer_id);
        let _guard = lock.lock();

        let valid = self.scan_valid(developer_id, now)?;
        let mut ranked: Vec<RankedContext> = valid
            .into_iter()
            .filter(|c| project_id.map_or(true, |p| c.project_id() == p))
            .map(|context| RankedContext {
                priority: self.scorer.score(&context, now),
                context,
            })
            .collect();
        ranked.sort_by(listing_order);
        Ok(ranked)
    }

    /// Valid snapshots, highest priority first.
    pub fn list_by_developer(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkContext>, CoreError> {
        Ok(self
            .list_ranked(developer_id, project_id, now)?
            .into_iter()
            .map(|r| r.context)
            .collect())
    }

    /// Highest-priority valid snapshot in scope.
    pub fn best(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkContext>, CoreError> {
        Ok(self
            .list_ranked(developer_id, project_id, now)?
            .into_iter()
            .next()
            .map(|r| r.context))
    }

    /// Remove a snapshot regardless of expiry. Returns whether one was removed.
    pub fn delete(&self, id: &str) -> Result<bool, CoreError> {
        let Some(existing) = self.backend.get(id)? else {
            return Ok(false);
        };
        let lock = self.partition(existing.developer_id());
        let _guard = lock.lock();
        Ok(self.backend.delete(id)?)
    }

    /// Remove every snapshot whose `expires_at <= now`.
    ///
    /// Partitions are swept one at a time, so reads for other developers
    /// proceed while a sweep runs.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let mut removed = 0;
        for developer_id in self.backend.developers()? {
            let lock = self.partition(&developer_id);
            let _guard = lock.lock();
            for context in self.backend.scan_developer(&developer_id)? {
                if context.is_expired(now) && self.backend.delete(context.id())? {
                    removed += 1;
                }
            }
        }
        self.prune_partitions();
        if removed > 0 {
            tracing::info!(removed, "swept expired work contexts");
        }
        Ok(removed)
    }

    /// Drop partition locks nobody currently holds. Locks are only cloned
    /// under the map lock, so a removed entry cannot still be in use.
    fn prune_partitions(&self) {
        self.partitions
            .write()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    fn partition_count(&self) -> usize {
        self.partitions.read().len()
    }

    /// Non-expired snapshots of a developer. Caller holds the partition lock.
    fn scan_valid(&self, developer_id: &str, now: DateTime<Utc>) -> Result<Vec<WorkContext>, CoreError> {
        Ok(self
            .backend
            .scan_developer(developer_id)?
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .collect())
    }

    /// Caller holds the partition lock.
    fn enforce_capacity(&self, developer_id: &str, now: DateTime<Utc>) -> Result<Vec<String>, CoreError> {
        let valid = self.scan_valid(developer_id, now)?;
        if valid.len() <= self.max_per_developer {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<RankedContext> = valid
            .into_iter()
            .map(|context| RankedContext {
                priority: self.scorer.score(&context, now),
                context,
            })
            .collect();
        ranked.sort_by(eviction_order);

        let excess = ranked.len() - self.max_per_developer;
        let mut evicted = Vec::with_capacity(excess);
        for victim in ranked.into_iter().take(excess) {
            self.backend.delete(victim.context.id())?;
            tracing::info!(
                id = victim.context.id(),
                developer = developer_id,
                priority = victim.priority,
                "evicted work context over capacity"
            );
            evicted.push(victim.context.id().to_string());
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActivityKind, WorkContextDraft};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn snapshot(id: &str, dev: &str, project: &str, age_minutes: i64, activity: ActivityKind) -> WorkContext {
        WorkContextDraft {
            id: Some(id.to_string()),
            activity,
            captured_at: Some(now() - Duration::minutes(age_minutes)),
            ..WorkContextDraft::new(dev, project)
        }
        .capture(now())
        .unwrap()
    }

    fn expired(id: &str, dev: &str) -> WorkContext {
        WorkContextDraft {
            id: Some(id.to_string()),
            captured_at: Some(now() - Duration::days(8)),
            ..WorkContextDraft::new(dev, "proj")
        }
        .capture(now())
        .unwrap()
    }

    #[test]
    fn put_then_get_returns_snapshot() {
        let store = SnapshotStore::in_memory();
        let ctx = snapshot("a", "dev", "proj", 0, ActivityKind::Coding);
        store.put(ctx.clone(), now()).unwrap();
        assert_eq!(store.get("a", now()).unwrap(), Some(ctx));
        assert_eq!(store.get("missing", now()).unwrap(), None);
    }

    #[test]
    fn put_is_idempotent() {
        let store = SnapshotStore::in_memory();
        let ctx = snapshot("a", "dev", "proj", 0, ActivityKind::Coding);
        store.put(ctx.clone(), now()).unwrap();
        store.put(ctx.clone(), now()).unwrap();
        assert_eq!(store.list_by_developer("dev", None, now()).unwrap(), vec![ctx.clone()]);
        assert_eq!(store.get("a", now()).unwrap(), Some(ctx));
    }

    #[test]
    fn expired_snapshot_reports_expired_then_missing() {
        let store = SnapshotStore::in_memory();
        store.put(expired("old", "dev"), now()).unwrap();
        assert!(store.list_by_developer("dev", None, now()).unwrap().is_empty());
        assert!(matches!(store.lookup("old", now()).unwrap(), Lookup::Expired { .. }));
        assert!(matches!(store.lookup("old", now()).unwrap(), Lookup::Missing { .. }));

        let ctx = snapshot("soon", "dev", "proj", 0, ActivityKind::Coding);
        let expires = ctx.expires_at();
        store.put(ctx, now()).unwrap();
        let later = expires + Duration::seconds(1);
        assert!(matches!(store.lookup("soon", later).unwrap(), Lookup::Expired { .. }));
        assert!(matches!(store.lookup("soon", later).unwrap(), Lookup::Missing { .. }));
    }

    #[test]
    fn list_orders_by_priority_then_recency() {
        let store = SnapshotStore::in_memory();
        store.put(snapshot("meeting", "dev", "proj", 1, ActivityKind::Meeting), now()).unwrap();
        store.put(snapshot("coding", "dev", "proj", 1, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("coding-old", "dev", "proj", 600, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("coding-2", "dev", "proj", 2, ActivityKind::Coding), now()).unwrap();

        let ids: Vec<String> = store
            .list_by_developer("dev", None, now())
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        // coding and coding-2 tie on priority; the more recent capture wins
        assert_eq!(ids, vec!["coding", "coding-2", "meeting", "coding-old"]);
    }

    #[test]
    fn list_filters_by_project_and_developer() {
        let store = SnapshotStore::in_memory();
        store.put(snapshot("a", "dev", "alpha", 0, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("b", "dev", "beta", 0, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("c", "other", "alpha", 0, ActivityKind::Coding), now()).unwrap();

        let alpha = store.list_by_developer("dev", Some("alpha"), now()).unwrap();
        assert_eq!(alpha.len(), 1);
        assert_eq!(alpha[0].id(), "a");
        assert_eq!(store.list_by_developer("dev", None, now()).unwrap().len(), 2);
        assert_eq!(store.best("other", None, now()).unwrap().unwrap().id(), "c");
    }

    #[test]
    fn capacity_evicts_lowest_priority_first() {
        let store = SnapshotStore::new(Arc::new(MemoryBackend::new()), PriorityScorer::new(), 2);
        store.put(snapshot("coding", "dev", "p", 0, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("meeting", "dev", "p", 0, ActivityKind::Meeting), now()).unwrap();
        let evicted = store.put(snapshot("testing", "dev", "p", 0, ActivityKind::Testing), now()).unwrap();

        assert_eq!(evicted, vec!["meeting".to_string()]);
        let ids: Vec<String> = store
            .list_by_developer("dev", None, now())
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ids, vec!["coding", "testing"]);
    }

    #[test]
    fn capacity_ties_evict_oldest_capture() {
        let store = SnapshotStore::new(Arc::new(MemoryBackend::new()), PriorityScorer::new(), 1);
        // Both within the first recency step, so priorities tie
        store.put(snapshot("older", "dev", "p", 4, ActivityKind::Coding), now()).unwrap();
        let evicted = store.put(snapshot("newer", "dev", "p", 1, ActivityKind::Coding), now()).unwrap();
        assert_eq!(evicted, vec!["older".to_string()]);
    }

    #[test]
    fn capacity_is_per_developer() {
        let store = SnapshotStore::new(Arc::new(MemoryBackend::new()), PriorityScorer::new(), 1);
        store.put(snapshot("a", "alice", "p", 0, ActivityKind::Coding), now()).unwrap();
        let evicted = store.put(snapshot("b", "bob", "p", 0, ActivityKind::Coding), now()).unwrap();
        assert!(evicted.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SnapshotStore::new(backend.clone(), PriorityScorer::new(), 10);
        store.put(snapshot("fresh", "alice", "p", 0, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("stale", "bob", "p", 0, ActivityKind::Coding), now()).unwrap();
        store.put(expired("ancient", "bob"), now()).unwrap();

        assert_eq!(store.sweep_expired(now()).unwrap(), 1);
        assert_eq!(backend.len(), 2);
        assert_eq!(store.sweep_expired(now() + Duration::days(8)).unwrap(), 2);
        assert!(backend.is_empty());
    }

    #[test]
    fn delete_is_unconditional() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SnapshotStore::new(backend.clone(), PriorityScorer::new(), 10);
        backend.put(&expired("ancient", "bob")).unwrap();
        assert!(store.delete("ancient").unwrap());
        assert!(!store.delete("ancient").unwrap());
    }

    #[test]
    fn put_moves_id_between_developers() {
        let store = SnapshotStore::in_memory();
        store.put(snapshot("shared", "alice", "p", 0, ActivityKind::Coding), now()).unwrap();
        store.put(snapshot("shared", "bob", "p", 0, ActivityKind::Coding), now()).unwrap();
        assert!(store.list_by_developer("alice", None, now()).unwrap().is_empty());
        assert_eq!(store.list_by_developer("bob", None, now()).unwrap().len(), 1);
    }

    #[test]
    fn sweep_prunes_idle_partition_locks() {
        let store = SnapshotStore::in_memory();
        for dev in ["alice", "bob", "carol"] {
            store.put(snapshot(&format!("{dev}-1"), dev, "p", 0, ActivityKind::Coding), now()).unwrap();
        }
        assert_eq!(store.partition_count(), 3);

        let held = store.partition("alice");
        store.sweep_expired(now()).unwrap();
        assert_eq!(store.partition_count(), 1);

        drop(held);
        store.sweep_expired(now()).unwrap();
        assert_eq!(store.partition_count(), 0);
        assert_eq!(store.list_by_developer("bob", None, now()).unwrap().len(), 1);
    }
}
