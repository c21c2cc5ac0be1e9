//! Metric storage layer.
//!
//! The [`MetricStore`] trait is the single capability interface the rest of
//! statmon programs against; backends are selected at construction time and
//! injected, never reached through ambient globals. Two implementations ship:
//! [`memory::MemoryStore`] (reader/writer lock over a map) and
//! [`sqlite::SqliteStore`] (row-level upserts in SQLite).

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod sqlite;


use std::collections::HashMap;

use statmon_common::types::{Metric, MetricKey, MetricKind};

pub use error::{Result, StorageError};

/// Keyed metric container with kind-aware update rules.
///
/// Implementations must be `Send + Sync`: the store is shared between the
/// HTTP handlers (or the agent's poll loop) and the persistence task. One
/// writer at a time per instance; readers may proceed concurrently with each
/// other but not with a writer.
pub trait MetricStore: Send + Sync {
    /// Applies one record. Gauges replace the stored value unconditionally;
    /// counters accumulate `old_delta + new_delta` (inserting the delta as-is
    /// when no prior record exists), saturating at the `i64` bounds. Returns
    /// the post-update record, so a counter update reports the running total.
    ///
    /// Records failing [`Metric::validate`] are rejected before any state
    /// changes.
    fn update(&self, metric: &Metric) -> Result<Metric>;

    /// Applies records in the given order, atomically with respect to
    /// concurrent readers: no reader observes a partially-applied batch.
    /// Every record is validated before any is applied.
    fn update_batch(&self, metrics: &[Metric]) -> Result<()>;

    /// Fails with [`StorageError::NotFound`] when the `(kind, id)` pair is
    /// absent.
    fn get(&self, kind: MetricKind, id: &str) -> Result<Metric>;

    /// A consistent value-copy snapshot of the full store.
    fn get_all(&self) -> Result<HashMap<MetricKey, Metric>>;

    /// Liveness check of the backing medium: a no-op for the in-memory
    /// backend, a connectivity probe for SQLite.
    fn ping(&self) -> Result<()>;
}
