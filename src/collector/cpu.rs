//! CPU utilization collector.
//!
//! Reads the aggregate `cpu` line of `/proc/stat` and publishes utilization
//! percentages computed from the difference between two consecutive ticks.

use std::path::{Path, PathBuf};

use super::procfs::{CpuTimes, parse_cpu_times};
use super::traits::FileSystem;
use super::{CollectError, Collector, HOSTNAME_LABEL, read_source, register_all};
use crate::registry::Registry;

pub const CPU_TOTAL: &str = "cpu_total";
pub const CPU_USER: &str = "cpu_user";
pub const CPU_SYSTEM: &str = "cpu_system";
pub const CPU_STEAL: &str = "cpu_steal";

const METRICS: [(&str, &str); 4] = [
    (CPU_TOTAL, "CPU usage percentage"),
    (CPU_USER, "User process CPU usage percentage"),
    (CPU_SYSTEM, "System process CPU usage percentage"),
    (CPU_STEAL, "CPU steal percentage"),
];

/// Utilization over one interval, in percent truncated to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuUsage {
    /// Everything except idle.
    pub total: f64,
    pub user: f64,
    pub system: f64,
    pub steal: f64,
}

/// Truncates towards negative infinity at two decimal places.
pub fn truncate_2dp(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// `part` as a percentage of `whole`; zero when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    truncate_2dp(100.0 * part as f64 / whole as f64)
}

/// Computes utilization between two readings.
///
/// Counters that went backwards (e.g. after a reset) count as zero delta.
pub fn cpu_usage(previous: &CpuTimes, current: &CpuTimes) -> CpuUsage {
    let total_delta = current.total().saturating_sub(previous.total());
    let idle_delta = current.idle.saturating_sub(previous.idle);
    let busy_delta = total_delta.saturating_sub(idle_delta);

    CpuUsage {
        total: percentage(busy_delta, total_delta),
        user: percentage(current.user.saturating_sub(previous.user), total_delta),
        system: percentage(current.system.saturating_sub(previous.system), total_delta),
        steal: percentage(current.steal.saturating_sub(previous.steal), total_delta),
    }
}

/// Publishes `cpu_total`, `cpu_user`, `cpu_system` and `cpu_steal`.
///
/// The first tick only records a baseline and publishes nothing.
pub struct CpuCollector<F: FileSystem> {
    fs: F,
    source: PathBuf,
    hostname: String,
    previous: Option<CpuTimes>,
}

impl<F: FileSystem> CpuCollector<F> {
    pub fn new(fs: F, source: impl AsRef<Path>, hostname: impl Into<String>) -> Self {
        Self {
            fs,
            source: source.as_ref().to_path_buf(),
            hostname: hostname.into(),
            previous: None,
        }
    }

    fn read_times(&self) -> Result<CpuTimes, CollectError> {
        let content = read_source(&self.fs, &self.source)?;
        Ok(parse_cpu_times(&content)?)
    }
}

impl<F: FileSystem> Collector for CpuCollector<F> {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn register_metrics(&self, registry: &Registry) {
        register_all(registry, &METRICS, &[HOSTNAME_LABEL]);
    }

    fn report(&mut self, registry: &Registry) -> Result<(), CollectError> {
        let current = self.read_times()?;
        let Some(previous) = self.previous.replace(current) else {
            return Ok(());
        };

        let usage = cpu_usage(&previous, &current);
        let labels = [self.hostname.as_str()];
        registry.update(CPU_TOTAL, usage.total, &labels);
        registry.update(CPU_USER, usage.user, &labels);
        registry.update(CPU_SYSTEM, usage.system, &labels);
        registry.update(CPU_STEAL, usage.steal, &labels);
        Ok(())
    }
}
