//! Metric collection for the statmon agent.
//!
//! Each [`MetricSource`] implementation produces a finite set of named
//! samples per invocation; the [`Poller`] writes them into the local store as
//! one atomic batch, together with the `PollCount` counter increment.

pub mod fixed;
pub mod runtime;

use std::sync::Arc;

use anyhow::Result;
use statmon_common::types::Metric;
use statmon_storage::MetricStore;

/// Counter incremented by 1 on every poll.
pub const POLL_COUNT: &str = "PollCount";

/// A sampler of gauge metrics on the agent host.
///
/// Implementations are registered in the agent's poll loop and called at
/// each poll interval.
pub trait MetricSource: Send {
    /// Source name (e.g. `"runtime"`), used for logging.
    fn name(&self) -> &str;

    /// Produces the current samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn sample(&mut self) -> Result<Vec<Metric>>;
}

/// Samples every registered source into the shared store.
pub struct Poller {
    sources: Vec<Box<dyn MetricSource>>,
    store: Arc<dyn MetricStore>,
}

impl Poller {
    pub fn new(sources: Vec<Box<dyn MetricSource>>, store: Arc<dyn MetricStore>) -> Self {
        Self { sources, store }
    }

    /// One poll: gathers all samples, appends the `PollCount` increment, and
    /// applies everything as a single batch. A failing source is logged and
    /// skipped; the poll itself only fails if the store write fails.
    pub fn poll_once(&mut self) -> Result<usize> {
        let mut batch = Vec::new();
        for source in &mut self.sources {
            match source.sample() {
                Ok(samples) => batch.extend(samples),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "sampling failed");
                }
            }
        }
        batch.push(Metric::counter(POLL_COUNT, 1));
        let count = batch.len();
        self.store.update_batch(&batch)?;
        tracing::debug!(count, "poll complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedSource;
    use statmon_common::types::MetricKind;
    use statmon_storage::memory::MemoryStore;

    fn poller_with(store: Arc<MemoryStore>, samples: Vec<Metric>) -> Poller {
        let source = FixedSource::new("fixed", samples);
        Poller::new(vec![Box::new(source)], store)
    }

    #[test]
    fn poll_writes_gauges_and_increments_poll_count() {
        let store = Arc::new(MemoryStore::new());
        let mut poller = poller_with(
            store.clone(),
            vec![Metric::gauge("Alloc", 1.0), Metric::gauge("Frees", 2.0)],
        );

        poller.poll_once().unwrap();
        assert_eq!(
            store.get(MetricKind::Gauge, "Alloc").unwrap().value,
            Some(1.0)
        );
        assert_eq!(
            store.get(MetricKind::Counter, POLL_COUNT).unwrap().delta,
            Some(1)
        );

        poller.poll_once().unwrap();
        poller.poll_once().unwrap();
        assert_eq!(
            store.get(MetricKind::Counter, POLL_COUNT).unwrap().delta,
            Some(3)
        );
    }

    #[test]
    fn failing_source_does_not_abort_the_poll() {
        struct Broken;
        impl MetricSource for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn sample(&mut self) -> Result<Vec<Metric>> {
                anyhow::bail!("sensor unavailable")
            }
        }

        let store = Arc::new(MemoryStore::new());
        let mut poller = Poller::new(
            vec![
                Box::new(Broken),
                Box::new(FixedSource::new("ok", vec![Metric::gauge("Alloc", 5.0)])),
            ],
            store.clone(),
        );

        poller.poll_once().unwrap();
        assert!(store.get(MetricKind::Gauge, "Alloc").is_ok());
        assert_eq!(
            store.get(MetricKind::Counter, POLL_COUNT).unwrap().delta,
            Some(1)
        );
    }
}
