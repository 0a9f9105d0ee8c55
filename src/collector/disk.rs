//! Disk collector: block device I/O counters and per-mount space usage.
//!
//! A tick runs two independent passes. I/O counters come from
//! `/proc/diskstats`; space usage comes from `statvfs` on every real mount
//! point listed in `/proc/mounts`. A failure in one pass does not stop the
//! other; the tick reports the first error after both ran.

use std::path::{Path, PathBuf};

use tracing::warn;

use super::procfs::{DiskStats, parse_diskstats, parse_mount_points};
use super::traits::{FileSystem, FsStats};
use super::{CollectError, Collector, HOSTNAME_LABEL, read_source, register_all};
use crate::registry::Registry;

pub const READS_COMPLETED: &str = "disk_reads_completed_total";
pub const WRITES_COMPLETED: &str = "disk_writes_completed_total";
pub const READ_BYTES: &str = "disk_read_throughput_bytes";
pub const WRITE_BYTES: &str = "disk_write_throughput_bytes";
pub const IO_IN_PROGRESS: &str = "disk_io_in_progress";
pub const IO_TIME: &str = "disk_io_time_spent_seconds";
pub const WEIGHTED_IO_TIME: &str = "disk_weighted_io_time_seconds";

pub const SPACE_TOTAL: &str = "disk_total_bytes";
pub const SPACE_USED: &str = "disk_used_bytes";
pub const SPACE_AVAILABLE: &str = "disk_available_bytes";
pub const SPACE_USAGE: &str = "disk_usage_percentage";

const IO_METRICS: [(&str, &str); 7] = [
    (READS_COMPLETED, "Total disk reads completed"),
    (WRITES_COMPLETED, "Total disk writes completed"),
    (READ_BYTES, "Disk read throughput in bytes"),
    (WRITE_BYTES, "Disk write throughput in bytes"),
    (IO_IN_PROGRESS, "Current disk IO operations in progress"),
    (IO_TIME, "Time spent on IO operations in seconds"),
    (WEIGHTED_IO_TIME, "Weighted time spent on IO in seconds"),
];

const SPACE_METRICS: [(&str, &str); 4] = [
    (SPACE_TOTAL, "Total disk space in bytes"),
    (SPACE_USED, "Used disk space in bytes"),
    (SPACE_AVAILABLE, "Available disk space in bytes"),
    (SPACE_USAGE, "Disk usage percentage"),
];

const DEVICE_LABEL: &str = "device";
const MOUNT_POINT_LABEL: &str = "mount_point";

/// Sector size `/proc/diskstats` counts in, regardless of the device.
const SECTOR_SIZE: u64 = 512;

/// Cumulative I/O counters of one block device, in exposition units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskIo {
    pub reads_completed: f64,
    pub writes_completed: f64,
    pub read_bytes: f64,
    pub write_bytes: f64,
    pub io_in_progress: f64,
    pub io_time_seconds: f64,
    pub weighted_io_time_seconds: f64,
}

impl From<&DiskStats> for DiskIo {
    fn from(stats: &DiskStats) -> Self {
        Self {
            reads_completed: stats.reads as f64,
            writes_completed: stats.writes as f64,
            read_bytes: stats.read_sectors.saturating_mul(SECTOR_SIZE) as f64,
            write_bytes: stats.write_sectors.saturating_mul(SECTOR_SIZE) as f64,
            io_in_progress: stats.io_in_progress as f64,
            io_time_seconds: stats.io_time as f64 / 1000.0,
            weighted_io_time_seconds: stats.io_weighted_time as f64 / 1000.0,
        }
    }
}

/// Space usage of one mounted filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskSpace {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    /// `used / total` in percent; zero for an empty filesystem.
    pub usage: f64,
}

impl From<FsStats> for DiskSpace {
    fn from(stats: FsStats) -> Self {
        let total = stats.blocks.saturating_mul(stats.block_size);
        let free = stats.blocks_free.saturating_mul(stats.block_size);
        let available = stats.blocks_available.saturating_mul(stats.block_size);
        let used = total.saturating_sub(free);
        let usage = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };

        Self {
            total,
            used,
            available,
            usage,
        }
    }
}

/// Publishes block device I/O counters and mount point space usage.
pub struct DiskCollector<F: FileSystem> {
    fs: F,
    diskstats: PathBuf,
    mounts: PathBuf,
    hostname: String,
}

impl<F: FileSystem> DiskCollector<F> {
    pub fn new(
        fs: F,
        diskstats: impl AsRef<Path>,
        mounts: impl AsRef<Path>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            diskstats: diskstats.as_ref().to_path_buf(),
            mounts: mounts.as_ref().to_path_buf(),
            hostname: hostname.into(),
        }
    }

    fn report_io(&self, registry: &Registry) -> Result<(), CollectError> {
        let content = read_source(&self.fs, &self.diskstats)?;

        for stats in parse_diskstats(&content) {
            let io = DiskIo::from(&stats);
            let labels = [self.hostname.as_str(), stats.device.as_str()];
            for (name, value) in [
                (READS_COMPLETED, io.reads_completed),
                (WRITES_COMPLETED, io.writes_completed),
                (READ_BYTES, io.read_bytes),
                (WRITE_BYTES, io.write_bytes),
                (IO_IN_PROGRESS, io.io_in_progress),
                (IO_TIME, io.io_time_seconds),
                (WEIGHTED_IO_TIME, io.weighted_io_time_seconds),
            ] {
                registry.update(name, value, &labels);
            }
        }
        Ok(())
    }

    fn report_space(&self, registry: &Registry) -> Result<(), CollectError> {
        let content = read_source(&self.fs, &self.mounts)?;

        for mount_point in parse_mount_points(&content) {
            let stats = match self.fs.statvfs(Path::new(&mount_point)) {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(mount_point = %mount_point, error = %e, "statvfs failed, skipping mount");
                    continue;
                }
            };

            let space = DiskSpace::from(stats);
            let labels = [self.hostname.as_str(), mount_point.as_str()];
            registry.update(SPACE_TOTAL, space.total as f64, &labels);
            registry.update(SPACE_USED, space.used as f64, &labels);
            registry.update(SPACE_AVAILABLE, space.available as f64, &labels);
            registry.update(SPACE_USAGE, space.usage, &labels);
        }
        Ok(())
    }
}

impl<F: FileSystem> Collector for DiskCollector<F> {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn register_metrics(&self, registry: &Registry) {
        register_all(registry, &IO_METRICS, &[HOSTNAME_LABEL, DEVICE_LABEL]);
        register_all(registry, &SPACE_METRICS, &[HOSTNAME_LABEL, MOUNT_POINT_LABEL]);
    }

    fn report(&mut self, registry: &Registry) -> Result<(), CollectError> {
        let io = self.report_io(registry);
        let space = self.report_space(registry);
        io.and(space)
    }
}
