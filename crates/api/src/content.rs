//! Read-only view over the resources of one content unit.

use std::collections::BTreeMap;
use std::io::{self, Read};

/// Parsed key-value header block (manifest main section).
pub type Headers = BTreeMap<String, String>;

/// Byte stream of a single entry.
pub type EntryStream = Box<dyn Read + Send>;

/// A single resource inside a content provider.
pub trait ContentEntry: Send + Sync {
    /// Entry name relative to the provider root, `/` separated
    fn name(&self) -> &str;

    /// Uncompressed size in bytes
    fn size(&self) -> u64;

    /// Milliseconds since the Unix epoch, 0 when unknown
    fn last_modified(&self) -> u64;

    /// Open a fresh stream over the entry bytes
    fn open_stream(&self) -> io::Result<EntryStream>;

    /// Read the whole entry into memory. The buffer grows with the bytes
    /// actually read, not with the declared size.
    fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open_stream()?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Uniform content access for archives, directories and embedded indices.
///
/// `open`/`close` bracket resource access and are idempotent. Lookups of
/// missing entries return `None` and never fail.
pub trait ContentProvider: Send + Sync {
    fn open(&self) -> io::Result<()>;

    fn close(&self) -> io::Result<()>;

    /// Entry names. Finite, and a new call restarts from the beginning.
    fn entries(&self) -> Box<dyn Iterator<Item = String> + Send + '_>;

    fn entry(&self, name: &str) -> Option<Box<dyn ContentEntry>>;

    /// Header block, when cheaply available
    fn headers(&self) -> Option<Headers>;

    /// Short human-readable origin (path or index id), used in logs
    fn origin(&self) -> String;

    fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }
}
