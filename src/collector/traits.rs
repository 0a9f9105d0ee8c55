//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the collectors to work with both the real
//! `/proc` filesystem on Linux and mock implementations for testing on macOS
//! or in CI.

use std::io;
use std::path::Path;

/// Filesystem statistics for a single mount point, as returned by `statvfs(3)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    /// Total data blocks in the filesystem.
    pub blocks: u64,
    /// Free blocks available to unprivileged users.
    pub blocks_available: u64,
    /// Free blocks, including those reserved for root.
    pub blocks_free: u64,
    /// Fundamental block size in bytes; the unit of the block counts.
    pub block_size: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    ///
    /// # Returns
    /// The file contents as a string, or an I/O error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Queries space statistics of the filesystem mounted at `path`.
    fn statvfs(&self, path: &Path) -> io::Result<FsStats>;
}

/// Real filesystem implementation that delegates to `std::fs` and `statvfs(3)`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    #[allow(clippy::unnecessary_cast)]
    fn statvfs(&self, path: &Path) -> io::Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
        Ok(FsStats {
            blocks: stat.blocks() as u64,
            blocks_available: stat.blocks_available() as u64,
            blocks_free: stat.blocks_free() as u64,
            block_size: stat.fragment_size() as u64,
        })
    }
}
