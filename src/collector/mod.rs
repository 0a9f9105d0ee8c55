//! Host resource collectors for Linux.
//!
//! This module provides the collectors that turn `/proc` files into gauge
//! values in the [`Registry`], with support for mocking for testing on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Collector (trait)                        │
//! │  ┌────────────┐ ┌─────────────┐ ┌────────────┐ ┌──────────┐  │
//! │  │    Cpu     │ │   Memory    │ │  Network   │ │   Disk   │  │
//! │  │ /proc/stat │ │/proc/meminfo│ │  net/dev   │ │diskstats │  │
//! │  │            │ │             │ │            │ │ mounts   │  │
//! │  └─────┬──────┘ └──────┬──────┘ └─────┬──────┘ └────┬─────┘  │
//! │        └───────────────┴──────┬───────┴─────────────┘        │
//! │                        ┌──────▼──────┐                       │
//! │                        │  FileSystem │ (trait)               │
//! │                        └──────┬──────┘                       │
//! └───────────────────────────────┼──────────────────────────────┘
//!                  ┌──────────────┼──────────────┐
//!           ┌──────▼──────┐┌──────▼──────┐┌──────▼──────┐
//!           │   RealFs    ││   MockFs    ││  Scenarios  │
//!           │  (Linux)    ││  (Testing)  ││ (Fixtures)  │
//!           └─────────────┘└─────────────┘└─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use hostmetrics::collector::{Collector, CpuCollector, MockFs};
//! use hostmetrics::registry::Registry;
//!
//! let registry = Registry::new();
//! let mut cpu = CpuCollector::new(MockFs::typical_system(), "/proc/stat", "host-a");
//! cpu.register_metrics(&registry);
//! cpu.report(&registry).unwrap();
//! ```

pub mod cpu;
pub mod disk;
mod error;
pub mod memory;
pub mod mock;
pub mod network;
pub mod procfs;
pub mod sources;
pub mod traits;

use std::path::Path;

use crate::registry::Registry;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use error::CollectError;
pub use memory::MemoryCollector;
pub use mock::MockFs;
pub use network::NetworkCollector;
pub use sources::SourcePaths;
pub use traits::{FileSystem, FsStats, RealFs};

/// Label attached to every host-level metric.
pub const HOSTNAME_LABEL: &str = "hostname";

/// A periodic source of metrics.
///
/// Implementations own whatever state they need between ticks (such as the
/// previous counter snapshot) and write results into the shared registry.
pub trait Collector: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Registers every metric this collector will update.
    fn register_metrics(&self, registry: &Registry);

    /// Reads the sources once and updates the registry.
    ///
    /// On error the registry keeps the values of the last successful tick.
    fn report(&mut self, registry: &Registry) -> Result<(), CollectError>;
}

/// Builds the fixed set of host collectors over one filesystem.
pub fn host_collectors<F>(fs: F, paths: &SourcePaths, hostname: &str) -> Vec<Box<dyn Collector>>
where
    F: FileSystem + Clone + 'static,
{
    vec![
        Box::new(CpuCollector::new(fs.clone(), &paths.cpu_stat, hostname)) as Box<dyn Collector>,
        Box::new(MemoryCollector::new(fs.clone(), &paths.memory_info, hostname)),
        Box::new(NetworkCollector::new(fs.clone(), &paths.network_dev, hostname)),
        Box::new(DiskCollector::new(
            fs,
            &paths.disk_stats,
            &paths.disk_mounts,
            hostname,
        )),
    ]
}

/// Reads a source file, attaching its path to any I/O error.
pub(crate) fn read_source<F: FileSystem>(fs: &F, path: &Path) -> Result<String, CollectError> {
    fs.read_to_string(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Registers `(name, help)` pairs that share the same label names.
pub(crate) fn register_all(registry: &Registry, metrics: &[(&str, &str)], label_names: &[&str]) {
    for (name, help) in metrics {
        registry.register(name, help, label_names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_collectors_on_typical_system() {
        let registry = Registry::new();
        let mut collectors =
            host_collectors(MockFs::typical_system(), &SourcePaths::default(), "host-a");

        let names: Vec<&str> = collectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["cpu", "memory", "network", "disk"]);

        for collector in &collectors {
            collector.register_metrics(&registry);
        }
        for collector in &mut collectors {
            collector.report(&registry).unwrap();
        }

        // Memory and disk publish on the first tick; cpu and network need two.
        assert!(registry.get("memory_total_bytes", &["host-a"]).is_some());
        assert!(registry.get("disk_total_bytes", &["host-a", "/"]).is_some());
        assert_eq!(registry.get("cpu_total", &["host-a"]), None);
    }

    #[test]
    fn test_host_collectors_follow_custom_proc_root() {
        let registry = Registry::new();
        let paths = SourcePaths::with_proc_root("/host/proc");
        let mut collectors = host_collectors(MockFs::typical_system_at(&paths), &paths, "h");

        for collector in &mut collectors {
            collector.register_metrics(&registry);
            collector.report(&registry).unwrap();
        }
        assert!(registry.get("memory_total_bytes", &["h"]).is_some());
    }

    #[test]
    fn test_read_source_missing_file() {
        let fs = MockFs::new();
        let err = read_source(&fs, Path::new("/proc/stat")).unwrap_err();
        assert!(matches!(err, CollectError::Io { ref path, .. } if path == Path::new("/proc/stat")));
    }
}
