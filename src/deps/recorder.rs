//! Thread-safe recorder merging per-render references into the shared index.

use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};

use super::index::{DependencyIndex, PathSet};
use super::store::DependencyStore;
use crate::debug;

/// Shared dependency index plus its durable store.
///
/// The read-modify-write of [`record`](Self::record) happens under a single
/// write lock, so documents finishing concurrently never lose updates.
/// Snapshots are taken while holding `persist`, so the file always reflects
/// a state at least as new as the previous write.
pub struct DependencyRecorder {
    index: RwLock<DependencyIndex>,
    persist: Mutex<()>,
    store: DependencyStore,
}

impl DependencyRecorder {
    pub fn new(store: DependencyStore) -> Self {
        Self {
            index: RwLock::new(DependencyIndex::new()),
            persist: Mutex::new(()),
            store,
        }
    }

    /// Record the components referenced by one render of `document`.
    ///
    /// An empty reference set neither mutates nor persists.
    pub fn record(&self, document: &Path, components: &PathSet) -> bool {
        if components.is_empty() {
            return false;
        }
        let changed = self.index.write().record(document, components);
        if changed {
            debug!("deps"; "{} -> {} component(s)", document.display(), components.len());
        }
        self.persist();
        changed
    }

    /// Union the on-disk index into memory, picking up writes by other processes.
    pub fn reload(&self) {
        let disk = self.store.load();
        if !disk.is_empty() {
            self.index.write().merge(disk);
        }
    }

    /// Documents affected by a change at `changed` (already normalized).
    pub fn affected_by(&self, changed: &Path) -> PathSet {
        self.index.read().affected_by(changed)
    }

    /// Clone of the current in-memory index.
    pub fn snapshot(&self) -> DependencyIndex {
        self.index.read().clone()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    fn persist(&self) {
        let _guard = self.persist.lock();
        let snapshot = self.index.read().clone();
        self.store.save(&snapshot);
    }
}

/// Collect references into a set, dropping duplicates.
pub fn path_set<I: IntoIterator<Item = PathBuf>>(paths: I) -> PathSet {
    paths.into_iter().collect()
}
