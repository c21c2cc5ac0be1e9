use anyhow::Result;
use statmon_common::types::Metric;

use crate::MetricSource;

/// Returns the same fixed samples on every invocation. Test double for the
/// live runtime sampler.
pub struct FixedSource {
    name: String,
    samples: Vec<Metric>,
}

impl FixedSource {
    pub fn new(name: impl Into<String>, samples: Vec<Metric>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }
}

impl MetricSource for FixedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&mut self) -> Result<Vec<Metric>> {
        Ok(self.samples.clone())
    }
}
