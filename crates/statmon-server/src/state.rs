use std::sync::Arc;

use statmon_common::crypto::Decryptor;
use statmon_common::signing::Signer;
use statmon_storage::snapshot::SnapshotFile;
use statmon_storage::MetricStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricStore>,
    /// Present only for the in-memory backend; SQLite persists itself.
    pub snapshot: Option<Arc<SnapshotFile>>,
    /// Synchronous persistence: flush after every successful write.
    pub sync_store: bool,
    pub signer: Option<Arc<Signer>>,
    pub decryptor: Option<Arc<Decryptor>>,
}

impl AppState {
    /// Flush hook for mutating handlers under the synchronous policy. A
    /// failed flush is logged; the store keeps serving from memory and the
    /// request still succeeds.
    pub fn flush_sync(&self) {
        if !self.sync_store {
            return;
        }
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(self.store.as_ref()) {
                tracing::warn!(error = %e, "synchronous snapshot flush failed, continuing in-memory");
            }
        }
    }
}
