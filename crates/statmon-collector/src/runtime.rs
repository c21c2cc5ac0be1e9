use anyhow::Result;
use rand::Rng;
use statmon_common::types::Metric;
use sysinfo::System;

use crate::MetricSource;

// Fixed memory gauge names, paired with their extractors below. Built into
// the source once at construction; there is no mutable global name list.
const MEMORY_GAUGES: &[&str] = &[
    "memory.total",
    "memory.used",
    "memory.available",
    "memory.used_percent",
    "memory.swap_total",
    "memory.swap_used",
];

/// Live OS/runtime sampler backed by sysinfo.
///
/// Produces the memory gauges, global and per-core CPU usage, and a
/// `RandomValue` gauge refreshed on every poll.
pub struct RuntimeSource {
    system: System,
    memory_gauges: Vec<&'static str>,
}

impl RuntimeSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();
        Self {
            system,
            memory_gauges: MEMORY_GAUGES.to_vec(),
        }
    }

    fn memory_value(&self, name: &str) -> f64 {
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let swap_total = self.system.total_swap();
        match name {
            "memory.total" => total as f64,
            "memory.used" => used as f64,
            "memory.available" => self.system.available_memory() as f64,
            "memory.used_percent" => {
                if total > 0 {
                    (used as f64 / total as f64) * 100.0
                } else {
                    0.0
                }
            }
            "memory.swap_total" => swap_total as f64,
            "memory.swap_used" => self.system.used_swap() as f64,
            _ => 0.0,
        }
    }
}

impl Default for RuntimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for RuntimeSource {
    fn name(&self) -> &str {
        "runtime"
    }

    fn sample(&mut self) -> Result<Vec<Metric>> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();

        let mut samples = Vec::with_capacity(self.memory_gauges.len() + 2);
        for name in &self.memory_gauges {
            samples.push(Metric::gauge(*name, self.memory_value(name)));
        }

        samples.push(Metric::gauge(
            "cpu.usage",
            self.system.global_cpu_usage() as f64,
        ));
        for (i, cpu) in self.system.cpus().iter().enumerate() {
            samples.push(Metric::gauge(
                format!("cpu.core_usage.{i}"),
                cpu.cpu_usage() as f64,
            ));
        }

        samples.push(Metric::gauge(
            "RandomValue",
            rand::thread_rng().gen::<f64>(),
        ));
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_produces_the_fixed_gauge_set() {
        let mut source = RuntimeSource::new();
        let samples = source.sample().unwrap();
        let names: Vec<&str> = samples.iter().map(|m| m.id.as_str()).collect();
        for expected in MEMORY_GAUGES {
            assert!(names.contains(expected), "missing {expected}");
        }
        assert!(names.contains(&"cpu.usage"));
        assert!(names.contains(&"RandomValue"));
        assert!(samples.iter().all(|m| m.validate().is_ok()));
    }
}
