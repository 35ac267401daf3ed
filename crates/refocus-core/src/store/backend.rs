//! Persistence seam for the snapshot store.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::context::WorkContext;
use crate::error::StoreError;

/// Key-value persistence for snapshots.
///
/// Backends only store and return records; expiry, ordering and eviction are
/// enforced by [`SnapshotStore`](super::SnapshotStore). Each snapshot carries
/// its own `expires_at`, so backends can index on it if they want to.
pub trait SnapshotBackend: Send + Sync {
    /// Insert or overwrite by snapshot id.
    fn put(&self, context: &WorkContext) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<WorkContext>, StoreError>;

    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// All snapshots of one developer, expired ones included.
    fn scan_developer(&self, developer_id: &str) -> Result<Vec<WorkContext>, StoreError>;

    /// Developers with at least one stored snapshot.
    fn developers(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process backend used when no persistence collaborator is configured.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, WorkContext>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn put(&self, context: &WorkContext) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(context.id().to_string(), context.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<WorkContext>, StoreError> {
        Ok(self.entries.read().get(id).cloned())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(id).is_some())
    }

    fn scan_developer(&self, developer_id: &str) -> Result<Vec<WorkContext>, StoreError> {
        Ok(self
            .entries
            .read()
            .values()
            .filter(|c| c.developer_id() == developer_id)
            .cloned()
            .collect())
    }

    fn developers(&self) -> Result<Vec<String>, StoreError> {
        let developers: BTreeSet<String> = self
            .entries
            .read()
            .values()
            .map(|c| c.developer_id().to_string())
            .collect();
        Ok(developers.into_iter().collect())
    }
}
