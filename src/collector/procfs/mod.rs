//! Readers for the Linux `/proc` filesystem.
//!
//! This module provides the parsers for the `/proc` files the resource
//! collectors consume.

pub mod parser;

pub use parser::{
    CpuTimes, DiskStats, MemInfo, NetDevStats, ParseError, parse_cpu_times, parse_diskstats,
    parse_meminfo, parse_mount_points, parse_net_dev,
};
