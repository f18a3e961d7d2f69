use super::*;
use tracing::warn;

impl Runtime {
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage.read().clone()
    }

    /// Write the current graph structure to the storage directory.
    ///
    /// The in-memory graph has already changed when this runs, so a failed
    /// write is logged instead of failing the operation.
    pub(super) fn persist(&self) {
        let Some(storage) = self.storage_dir() else {
            return;
        };
        let _guard = self.persist_lock.lock();
        let record = self.registry.snapshot();
        if let Err(e) = record.save(&storage) {
            warn!(
                "Failed to persist layer graph to {}: {}",
                storage.display(),
                e
            );
        }
    }
}
