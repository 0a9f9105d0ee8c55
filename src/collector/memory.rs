//! Memory collector reading `/proc/meminfo`.

use std::path::{Path, PathBuf};

use super::procfs::parse_meminfo;
use super::traits::FileSystem;
use super::{CollectError, Collector, HOSTNAME_LABEL, read_source, register_all};
use crate::registry::Registry;

pub const MEMORY_TOTAL: &str = "memory_total_bytes";
pub const MEMORY_FREE: &str = "memory_free_bytes";
pub const MEMORY_AVAILABLE: &str = "memory_available_bytes";
pub const HUGEPAGES_TOTAL: &str = "memory_hugepages_total";
pub const HUGEPAGES_FREE: &str = "memory_hugepages_free";
pub const HUGEPAGES_RSVD: &str = "memory_hugepages_rsvd";
pub const HUGEPAGES_SURP: &str = "memory_hugepages_surp";

const METRICS: [(&str, &str); 7] = [
    (MEMORY_TOTAL, "Total memory usage"),
    (MEMORY_FREE, "Free memory"),
    (MEMORY_AVAILABLE, "Available memory"),
    (HUGEPAGES_TOTAL, "Total number of huge pages"),
    (HUGEPAGES_FREE, "Number of free huge pages"),
    (HUGEPAGES_RSVD, "Number of reserved huge pages"),
    (HUGEPAGES_SURP, "Number of surplus huge pages"),
];

/// Publishes memory sizes in bytes and huge page counts. Stateless.
pub struct MemoryCollector<F: FileSystem> {
    fs: F,
    source: PathBuf,
    hostname: String,
}

impl<F: FileSystem> MemoryCollector<F> {
    pub fn new(fs: F, source: impl AsRef<Path>, hostname: impl Into<String>) -> Self {
        Self {
            fs,
            source: source.as_ref().to_path_buf(),
            hostname: hostname.into(),
        }
    }
}

impl<F: FileSystem> Collector for MemoryCollector<F> {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn register_metrics(&self, registry: &Registry) {
        register_all(registry, &METRICS, &[HOSTNAME_LABEL]);
    }

    fn report(&mut self, registry: &Registry) -> Result<(), CollectError> {
        let content = read_source(&self.fs, &self.source)?;
        let info = parse_meminfo(&content);

        let labels = [self.hostname.as_str()];
        for (name, value) in [
            (MEMORY_TOTAL, info.mem_total),
            (MEMORY_FREE, info.mem_free),
            (MEMORY_AVAILABLE, info.mem_available),
            (HUGEPAGES_TOTAL, info.hugepages_total),
            (HUGEPAGES_FREE, info.hugepages_free),
            (HUGEPAGES_RSVD, info.hugepages_rsvd),
            (HUGEPAGES_SURP, info.hugepages_surp),
        ] {
            registry.update(name, value as f64, &labels);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    #[test]
    fn test_report_typical_system() {
        let registry = Registry::new();
        let mut collector = MemoryCollector::new(MockFs::typical_system(), "/proc/meminfo", "h");
        collector.register_metrics(&registry);
        collector.report(&registry).unwrap();

        assert_eq!(
            registry.get(MEMORY_TOTAL, &["h"]),
            Some((16384000u64 * 1024) as f64)
        );
        assert_eq!(
            registry.get(MEMORY_FREE, &["h"]),
            Some((8192000u64 * 1024) as f64)
        );
        assert_eq!(
            registry.get(MEMORY_AVAILABLE, &["h"]),
            Some((12000000u64 * 1024) as f64)
        );
        assert_eq!(registry.get(HUGEPAGES_TOTAL, &["h"]), Some(16.0));
        assert_eq!(registry.get(HUGEPAGES_FREE, &["h"]), Some(8.0));
        assert_eq!(registry.get(HUGEPAGES_RSVD, &["h"]), Some(2.0));
        assert_eq!(registry.get(HUGEPAGES_SURP, &["h"]), Some(0.0));
    }

    #[test]
    fn test_report_missing_fields_default_to_zero() {
        let fs = MockFs::new();
        fs.add_file("/m", "MemTotal: 1 kB\n");

        let registry = Registry::new();
        let mut collector = MemoryCollector::new(fs, "/m", "h");
        collector.register_metrics(&registry);
        collector.report(&registry).unwrap();

        assert_eq!(registry.get(MEMORY_TOTAL, &["h"]), Some(1024.0));
        assert_eq!(registry.get(MEMORY_AVAILABLE, &["h"]), Some(0.0));
        assert_eq!(registry.get(HUGEPAGES_TOTAL, &["h"]), Some(0.0));
    }

    #[test]
    fn test_report_missing_source() {
        let registry = Registry::new();
        let mut collector = MemoryCollector::new(MockFs::new(), "/proc/meminfo", "h");
        collector.register_metrics(&registry);

        assert!(collector.report(&registry).is_err());
        assert_eq!(registry.get(MEMORY_TOTAL, &["h"]), None);
    }
}
