use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::procfs::ParseError;

/// Reasons a collector tick fails.
///
/// A failed tick leaves the registry untouched for the affected metrics,
/// so the previously published values stay visible to scrapers.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The source file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The source file was read but lacks required structure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The set of network interfaces changed between two reads.
    #[error("network interfaces changed between ticks: {previous:?} -> {current:?}")]
    InterfaceMismatch {
        previous: Vec<String>,
        current: Vec<String>,
    },
}
