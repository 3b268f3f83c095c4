use std::collections::HashMap;

use metrio_common::types::Metric;
use rand::Rng;
use sysinfo::System;

pub const POLL_COUNT: &str = "PollCount";
pub const RANDOM_VALUE: &str = "RandomValue";

/// Supplies raw named numeric values on demand.
pub trait SampleSource: Send {
    fn sample(&mut self) -> Vec<(String, f64)>;
}

type Probe = fn(&System) -> f64;

/// Static registry of gauge probes over the host statistics. Built once;
/// duplicate names are rejected at startup, never per cycle.
const PROBES: &[(&str, Probe)] = &[
    ("TotalMemory", |s| s.total_memory() as f64),
    ("FreeMemory", |s| s.free_memory() as f64),
    ("UsedMemory", |s| s.used_memory() as f64),
    ("AvailableMemory", |s| s.available_memory() as f64),
    ("TotalSwap", |s| s.total_swap() as f64),
    ("UsedSwap", |s| s.used_swap() as f64),
    ("CPUutilization1", |s| s.global_cpu_usage() as f64),
];

/// Host statistics source backed by sysinfo.
pub struct SystemSource {
    system: System,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl SampleSource for SystemSource {
    fn sample(&mut self) -> Vec<(String, f64)> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();
        PROBES
            .iter()
            .map(|(name, probe)| (name.to_string(), probe(&self.system)))
            .collect()
    }
}

/// Accumulates polled samples and turns them into outgoing snapshots.
/// `sample` runs every poll interval, `collect` every report interval.
pub struct Collector {
    source: Box<dyn SampleSource>,
    gauges: HashMap<String, f64>,
    random_value: f64,
    poll_count: i64,
}

impl Collector {
    pub fn new(mut source: Box<dyn SampleSource>) -> anyhow::Result<Self> {
        let mut gauges = HashMap::new();
        for (name, value) in source.sample() {
            if name == POLL_COUNT || name == RANDOM_VALUE {
                anyhow::bail!("sample source reuses reserved metric name: {name}");
            }
            if gauges.insert(name.clone(), value).is_some() {
                anyhow::bail!("duplicate metric name in sample source: {name}");
            }
        }
        Ok(Self {
            source,
            gauges,
            random_value: 0.0,
            poll_count: 0,
        })
    }

    /// Number of metrics in one snapshot: every source gauge plus
    /// RandomValue plus the PollCount counter. Sizes the staging queue.
    pub fn metric_count(&self) -> usize {
        self.gauges.len() + 2
    }

    /// Refreshes every registered gauge from the source, recomputes the
    /// synthetic random gauge and bumps the poll counter.
    pub fn sample(&mut self) {
        for (name, value) in self.source.sample() {
            self.gauges.insert(name, value);
        }
        self.random_value = rand::thread_rng().gen_range(0.0..1_000_000.0);
        self.poll_count += 1;
    }

    /// Builds the snapshot for this report cycle and resets the poll
    /// counter. The reset happens regardless of delivery outcome: the
    /// accounting is at-most-once by design.
    pub fn collect(&mut self) -> Vec<Metric> {
        let mut snapshot: Vec<Metric> = self
            .gauges
            .iter()
            .map(|(name, value)| Metric::gauge(name.clone(), *value))
            .collect();
        snapshot.push(Metric::gauge(RANDOM_VALUE, self.random_value));
        snapshot.push(Metric::counter(POLL_COUNT, self.poll_count));
        self.poll_count = 0;
        snapshot
    }
}
