//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing various system conditions.

use super::filesystem::MockFs;
use crate::collector::sources::SourcePaths;
use crate::collector::traits::FsStats;

impl MockFs {
    /// Creates a typical host: 4 CPUs, 16 GB of memory, two network
    /// interfaces, two disks and a handful of mounts.
    pub fn typical_system() -> Self {
        Self::typical_system_at(&SourcePaths::default())
    }

    /// Same host as [`MockFs::typical_system`], with each source file placed
    /// at the resolved `paths` instead of under `/proc`.
    pub fn typical_system_at(paths: &SourcePaths) -> Self {
        let fs = Self::new();

        fs.add_file(
            &paths.cpu_stat,
            "\
cpu  10000 500 3000 80000 1000 200 100 50 0 0
cpu0 2500 125 750 20000 250 50 25 12 0 0
cpu1 2500 125 750 20000 250 50 25 13 0 0
cpu2 2500 125 750 20000 250 50 25 12 0 0
cpu3 2500 125 750 20000 250 50 25 13 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_file(
            &paths.memory_info,
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
HugePages_Total:      16
HugePages_Free:        8
HugePages_Rsvd:        2
HugePages_Surp:        0
Hugepagesize:       2048 kB
",
        );

        fs.add_file(
            &paths.network_dev,
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
",
        );

        fs.add_file(
            &paths.disk_stats,
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
",
        );

        fs.add_file(
            &paths.disk_mounts,
            "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev,size=3267132k,mode=755 0 0
/dev/sda1 /data xfs rw,relatime 0 0
",
        );

        fs.add_mount_stats(
            "/",
            FsStats {
                blocks: 25_000_000,
                blocks_available: 10_000_000,
                blocks_free: 12_500_000,
                block_size: 4096,
            },
        );
        fs.add_mount_stats(
            "/sys",
            FsStats {
                blocks: 0,
                blocks_available: 0,
                blocks_free: 0,
                block_size: 4096,
            },
        );
        fs.add_mount_stats(
            "/data",
            FsStats {
                blocks: 1_000_000,
                blocks_available: 750_000,
                blocks_free: 750_000,
                block_size: 4096,
            },
        );

        fs
    }
}
