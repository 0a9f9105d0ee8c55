//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::{FileSystem, FsStats};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory filesystem for testing.
///
/// Stores file contents and per-mount `statvfs` results in memory. Clones
/// share the same storage, so a test can keep one handle and rewrite
/// `/proc` files between two collector ticks while the collector owns
/// another handle.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    inner: Arc<RwLock<MockFsInner>>,
}

#[derive(Debug, Default)]
struct MockFsInner {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Map from mount point to filesystem statistics.
    mounts: HashMap<PathBuf, FsStats>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content, replacing any previous content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file; later reads fail with `NotFound`.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.files.remove(path.as_ref());
    }

    /// Registers `statvfs` results for a mount point.
    pub fn add_mount_stats(&self, mount_point: impl AsRef<Path>, stats: FsStats) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .mounts
            .insert(mount_point.as_ref().to_path_buf(), stats);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn statvfs(&self, path: &Path) -> io::Result<FsStats> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.mounts.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_clones_share_storage() {
        let fs = MockFs::new();
        let handle = fs.clone();
        handle.add_file("/proc/stat", "cpu 1 2 3 4 5 6 7 8\n");

        assert!(fs.read_to_string(Path::new("/proc/stat")).is_ok());

        handle.remove_file("/proc/stat");
        assert!(fs.read_to_string(Path::new("/proc/stat")).is_err());
    }

    #[test]
    fn test_mock_fs_statvfs() {
        let fs = MockFs::new();
        let stats = FsStats {
            blocks: 100,
            blocks_available: 40,
            blocks_free: 50,
            block_size: 4096,
        };
        fs.add_mount_stats("/", stats);

        assert_eq!(fs.statvfs(Path::new("/")).unwrap(), stats);
        assert!(fs.statvfs(Path::new("/boot")).is_err());
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
