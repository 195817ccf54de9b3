use std::sync::{Arc, PoisonError, RwLock};

use crate::snapshot::Snapshot;

/// Holds the latest published snapshot
///
/// Readers get an `Arc` to an immutable snapshot, so a reader always sees the
/// timestamp and results of one single pass. Writers build the whole snapshot
/// before calling [`SnapshotCache::replace`]; the lock is only held for the
/// pointer swap, never across upstream I/O. Concurrent writers are allowed and
/// the last one wins.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> Arc<Snapshot> {
        // A panicked writer cannot leave a half-written Arc behind, so poisoning is ignored
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, snapshot.clone())
        };
        // The old snapshot is dropped outside the lock
        drop(previous);
        snapshot
    }
}
