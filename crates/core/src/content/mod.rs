//! Content provider backends.
//!
//! - [`ArchiveContent`]: zip archives, opened lazily
//! - [`DirectoryContent`]: exploded directories with a traversal guard
//! - [`EmbeddedContent`]: precomputed entry lists backed by a resource store

pub mod archive;
pub mod directory;
pub mod embedded;

pub use archive::ArchiveContent;
pub use directory::DirectoryContent;
pub use embedded::EmbeddedContent;

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
