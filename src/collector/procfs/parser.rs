//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.
//!
//! Individual fields that are missing or unparsable default to zero; only a
//! missing structural marker (such as the aggregate `cpu` line) is an error.

use thiserror::Error;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

fn parse_u64(s: Option<&&str>) -> u64 {
    s.and_then(|s| s.parse().ok()).unwrap_or(0)
}

// ============ CPU Stat Parser ============

/// Aggregate CPU times from the `cpu` line of `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Sum of all eight tick counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        [
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .into_iter()
        .fold(self.user, u64::saturating_add)
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Format: `cpu  user nice system idle iowait irq softirq steal guest guest_nice`
///
/// Per-CPU lines (`cpu0`, `cpu1`, ...) are ignored. Returns an error when the
/// aggregate line is absent.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes, ParseError> {
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"cpu") {
            continue;
        }

        let get_val = |idx: usize| -> u64 { parse_u64(parts.get(idx)) };

        return Ok(CpuTimes {
            user: get_val(1),
            nice: get_val(2),
            system: get_val(3),
            idle: get_val(4),
            iowait: get_val(5),
            irq: get_val(6),
            softirq: get_val(7),
            steal: get_val(8),
        });
    }

    Err(ParseError::new("aggregate cpu line not found in stat"))
}

// ============ Meminfo Parser ============

/// Parsed data from `/proc/meminfo`.
///
/// Memory sizes are in bytes; hugepage fields are page counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub hugepages_total: u64,
    pub hugepages_free: u64,
    pub hugepages_rsvd: u64,
    pub hugepages_surp: u64,
}

/// Parses `/proc/meminfo` content.
///
/// Format: `Key:   value [kB]`. Values carrying a `kB` unit are converted
/// to bytes, unit-less values (hugepage counts) are kept as-is.
pub fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let key = parts[0].trim_end_matches(':');
        let mut value = parse_u64(parts.get(1));
        if parts.get(2) == Some(&"kB") {
            value = value.saturating_mul(1024);
        }

        match key {
            "MemTotal" => info.mem_total = value,
            "MemFree" => info.mem_free = value,
            "MemAvailable" => info.mem_available = value,
            "HugePages_Total" => info.hugepages_total = value,
            "HugePages_Free" => info.hugepages_free = value,
            "HugePages_Rsvd" => info.hugepages_rsvd = value,
            "HugePages_Surp" => info.hugepages_surp = value,
            _ => {}
        }
    }

    info
}

// ============ Network Device Stats Parser ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    /// Bytes received
    pub rx_bytes: u64,
    /// Packets received
    pub rx_packets: u64,
    /// Receive errors
    pub rx_errs: u64,
    /// Receive drops
    pub rx_drop: u64,
    /// Bytes transmitted
    pub tx_bytes: u64,
    /// Packets transmitted
    pub tx_packets: u64,
    /// Transmit errors
    pub tx_errs: u64,
    /// Transmit drops
    pub tx_drop: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
///
/// The two header lines are skipped; interfaces are returned in file order.
pub fn parse_net_dev(content: &str) -> Vec<NetDevStats> {
    let mut devices = Vec::new();

    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };

        let interface = name.trim();
        if interface.is_empty() {
            continue;
        }

        let values: Vec<&str> = counters.split_whitespace().collect();
        let get_val = |idx: usize| -> u64 { parse_u64(values.get(idx)) };

        devices.push(NetDevStats {
            interface: interface.to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            rx_drop: get_val(3),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
            tx_errs: get_val(10),
            tx_drop: get_val(11),
        });
    }

    devices
}

// ============ Disk Stats Parser ============

/// Parsed data from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of reads completed
    pub reads: u64,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Number of writes completed
    pub writes: u64,
    /// Number of sectors written
    pub write_sectors: u64,
    /// Number of I/Os currently in progress
    pub io_in_progress: u64,
    /// Time spent doing I/Os (ms)
    pub io_time: u64,
    /// Weighted time spent doing I/Os (ms)
    pub io_weighted_time: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
///
/// Lines with fewer than 14 fields are skipped.
pub fn parse_diskstats(content: &str) -> Vec<DiskStats> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue; // Skip malformed lines
        }

        let get_val = |idx: usize| -> u64 { parse_u64(parts.get(idx)) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads: get_val(3),
            read_sectors: get_val(5),
            writes: get_val(7),
            write_sectors: get_val(9),
            io_in_progress: get_val(11),
            io_time: get_val(12),
            io_weighted_time: get_val(13),
        });
    }

    disks
}

// ============ Mounts Parser ============

/// Filesystem type prefixes that never back a real block device.
const PSEUDO_FS_PREFIXES: [&str; 2] = ["tmpfs", "proc"];

/// Extracts mount points of real filesystems from `/proc/mounts`.
///
/// Format: `device mountpoint fstype options dump pass`
///
/// Entries whose fstype starts with `tmpfs` or `proc` are dropped. Mount
/// points keep source order; octal escapes (`\040` for space) are decoded.
pub fn parse_mount_points(content: &str) -> Vec<String> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let fs_type = parts[2];
        if PSEUDO_FS_PREFIXES
            .iter()
            .any(|prefix| fs_type.starts_with(prefix))
        {
            continue;
        }

        mounts.push(unescape_mount_path(parts[1]));
    }

    mounts
}

/// Decodes the `\NNN` octal escapes the kernel uses for whitespace and
/// backslashes in mount paths.
fn unescape_mount_path(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..=i + 3]
                .iter()
                .fold(0u8, |acc, b| acc.wrapping_mul(8).wrapping_add(b - b'0'));
            out.push(code);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
