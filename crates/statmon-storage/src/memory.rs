use std::collections::HashMap;
use std::sync::RwLock;

use statmon_common::types::{Metric, MetricKey, MetricKind};

use crate::{MetricStore, Result, StorageError};

/// In-memory backend: a reader/writer lock over a keyed map.
///
/// `update_batch` holds the write lock for the whole batch, so concurrent
/// readers see either none or all of its records. Counter accumulation uses
/// saturating i64 addition; overflow clamps instead of wrapping or panicking.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<MetricKey, Metric>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Caller must have validated `metric` and must hold the write lock.
    fn apply(map: &mut HashMap<MetricKey, Metric>, metric: &Metric) -> Metric {
        let key = metric.key();
        match metric.kind {
            MetricKind::Gauge => {
                map.insert(key.clone(), metric.clone());
            }
            MetricKind::Counter => {
                let entry = map.entry(key.clone()).or_insert_with(|| {
                    let mut zero = metric.clone();
                    zero.delta = Some(0);
                    zero
                });
                let old = entry.delta.unwrap_or(0);
                let new = metric.delta.unwrap_or(0);
                entry.delta = Some(old.saturating_add(new));
            }
        }
        map[&key].clone()
    }
}

impl MetricStore for MemoryStore {
    fn update(&self, metric: &Metric) -> Result<Metric> {
        metric.validate()?;
        let mut map = self.records.write().unwrap();
        Ok(Self::apply(&mut map, metric))
    }

    fn update_batch(&self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            metric.validate()?;
        }
        let mut map = self.records.write().unwrap();
        for metric in metrics {
            Self::apply(&mut map, metric);
        }
        Ok(())
    }

    fn get(&self, kind: MetricKind, id: &str) -> Result<Metric> {
        let map = self.records.read().unwrap();
        map.get(&MetricKey {
            kind,
            id: id.to_string(),
        })
        .cloned()
        .ok_or_else(|| StorageError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    fn get_all(&self) -> Result<HashMap<MetricKey, Metric>> {
        Ok(self.records.read().unwrap().clone())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
