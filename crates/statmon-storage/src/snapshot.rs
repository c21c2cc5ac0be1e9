use std::collections::HashMap;
use std::path::{Path, PathBuf};

use statmon_common::retry::{retry_blocking, RetryPolicy};
use statmon_common::types::Metric;

use statmon_common::types::MetricKey;

use crate::{MetricStore, Result, StorageError};

/// Serializes the store's full state to the flat snapshot shape: a JSON
/// object mapping `"<kind>:<id>"` to the metric record. Key order is not
/// significant.
pub fn dump_bytes(store: &dyn MetricStore) -> Result<Vec<u8>> {
    encode(&store.get_all()?)
}

fn encode(records: &HashMap<MetricKey, Metric>) -> Result<Vec<u8>> {
    let mut map = serde_json::Map::new();
    for (key, metric) in records {
        map.insert(key.to_string(), serde_json::to_value(metric)?);
    }
    Ok(serde_json::to_vec(&serde_json::Value::Object(map))?)
}

/// Deserializes snapshot bytes back into records. Empty input is a valid
/// empty snapshot, not an error; map keys are redundant with the records and
/// are ignored.
pub fn load_bytes(bytes: &[u8]) -> Result<Vec<Metric>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let map: HashMap<String, Metric> = serde_json::from_slice(bytes)?;
    let mut records: Vec<Metric> = map.into_values().collect();
    // Stable restore order; the store applies batches in sequence.
    records.sort_by(|a, b| a.key().cmp(&b.key()));
    Ok(records)
}

/// On-disk snapshot file with open-with-retry semantics.
///
/// Writes retry transient failures on the fixed {1s, 3s, 5s} schedule; the
/// final error propagates so the caller can log it and keep serving from
/// memory.
pub struct SnapshotFile {
    path: PathBuf,
    policy: RetryPolicy,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(path: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dumps the store to disk. Returns the number of records written.
    pub fn save(&self, store: &dyn MetricStore) -> Result<usize> {
        let records = store.get_all()?;
        let count = records.len();
        let bytes = encode(&records)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        retry_blocking(&self.policy, |e: &std::io::Error| is_transient(e), || {
            std::fs::write(&self.path, &bytes)
        })?;
        tracing::debug!(path = %self.path.display(), count, "snapshot written");
        Ok(count)
    }

    /// Hydrates the store from disk. A missing or empty file is a valid
    /// "no prior state" condition and restores 0 records.
    ///
    /// Intended to run against an empty store before it serves traffic:
    /// counter records are re-inserted with their absolute accumulated
    /// deltas.
    pub fn restore(&self, store: &dyn MetricStore) -> Result<usize> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let records = load_bytes(&bytes)?;
        store.update_batch(&records)?;
        Ok(records.len())
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    // Permission failures will not heal on their own.
    e.kind() != std::io::ErrorKind::PermissionDenied
}
