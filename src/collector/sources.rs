//! Locations of the `/proc` files read by the collectors.
//!
//! Every path defaults to a file below the configured proc root and can be
//! pointed elsewhere with an environment variable, which is how the
//! collectors are aimed at captured fixtures or a host `/proc` bind-mounted
//! into a container.

use std::path::{Path, PathBuf};

/// Overrides the CPU statistics file (default `<proc>/stat`).
pub const CPU_STAT_VAR: &str = "PROC_CPU_STAT";
/// Overrides the memory information file (default `<proc>/meminfo`).
pub const MEMORY_INFO_VAR: &str = "PROC_MEMORY_INFO";
/// Overrides the network device file (default `<proc>/net/dev`).
pub const NETWORK_DEV_VAR: &str = "PROC_NETWORK_DEV";
/// Overrides the block device statistics file (default `<proc>/diskstats`).
pub const DISK_STATS_VAR: &str = "PROC_DISK_STATS";
/// Overrides the mount table (default `<proc>/mounts`).
pub const DISK_MOUNTS_VAR: &str = "PROC_DISK_MOUNTS";

/// Resolved source paths, one per `/proc` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub cpu_stat: PathBuf,
    pub memory_info: PathBuf,
    pub network_dev: PathBuf,
    pub disk_stats: PathBuf,
    pub disk_mounts: PathBuf,
}

impl SourcePaths {
    /// Default locations below `proc_root`.
    pub fn with_proc_root(proc_root: impl AsRef<Path>) -> Self {
        let root = proc_root.as_ref();
        Self {
            cpu_stat: root.join("stat"),
            memory_info: root.join("meminfo"),
            network_dev: root.join("net/dev"),
            disk_stats: root.join("diskstats"),
            disk_mounts: root.join("mounts"),
        }
    }

    /// Replaces each path for which `lookup` yields a non-empty value.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let slots: [(&str, &mut PathBuf); 5] = [
            (CPU_STAT_VAR, &mut self.cpu_stat),
            (MEMORY_INFO_VAR, &mut self.memory_info),
            (NETWORK_DEV_VAR, &mut self.network_dev),
            (DISK_STATS_VAR, &mut self.disk_stats),
            (DISK_MOUNTS_VAR, &mut self.disk_mounts),
        ];
        for (var, slot) in slots {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }
        self
    }

    /// Default locations below `proc_root`, overridden from the process environment.
    pub fn from_env(proc_root: impl AsRef<Path>) -> Self {
        Self::with_proc_root(proc_root).with_overrides(|var| std::env::var(var).ok())
    }
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self::with_proc_root("/proc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_below_proc_root() {
        let paths = SourcePaths::with_proc_root("/host/proc");
        assert_eq!(paths.cpu_stat, Path::new("/host/proc/stat"));
        assert_eq!(paths.memory_info, Path::new("/host/proc/meminfo"));
        assert_eq!(paths.network_dev, Path::new("/host/proc/net/dev"));
        assert_eq!(paths.disk_stats, Path::new("/host/proc/diskstats"));
        assert_eq!(paths.disk_mounts, Path::new("/host/proc/mounts"));
        assert_eq!(SourcePaths::default(), SourcePaths::with_proc_root("/proc"));
    }

    #[test]
    fn test_overrides_replace_only_given_paths() {
        let env: HashMap<&str, &str> = HashMap::from([
            (CPU_STAT_VAR, "/fixtures/stat"),
            (DISK_MOUNTS_VAR, "/fixtures/mounts"),
            (NETWORK_DEV_VAR, ""),
        ]);
        let paths = SourcePaths::default()
            .with_overrides(|var| env.get(var).map(|v| v.to_string()));

        assert_eq!(paths.cpu_stat, Path::new("/fixtures/stat"));
        assert_eq!(paths.disk_mounts, Path::new("/fixtures/mounts"));
        assert_eq!(paths.network_dev, Path::new("/proc/net/dev"));
        assert_eq!(paths.memory_info, Path::new("/proc/meminfo"));
    }
}
