//! Exploded directory content.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use strata_api::{ContentEntry, ContentProvider, EntryStream, Headers};
use tracing::warn;
use walkdir::WalkDir;

use super::millis_since_epoch;
use crate::manifest;

/// Content rooted at a directory.
///
/// Every lookup is canonicalized and must stay inside the root.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    root: PathBuf,
}

impl DirectoryContent {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an entry name to a path inside the root.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let candidate = self.root.join(name.trim_start_matches('/'));
        let canonical = candidate.canonicalize().ok()?;
        if !canonical.starts_with(&self.root) {
            warn!(
                "Rejected entry {:?} resolving outside {}",
                name,
                self.root.display()
            );
            return None;
        }
        Some(canonical)
    }

    fn entry_name(&self, path: &Path, is_dir: bool) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_dir {
            name.push('/');
        }
        Some(name)
    }
}

impl ContentProvider for DirectoryContent {
    fn open(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(
            WalkDir::new(&self.root)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter_map(move |e| self.entry_name(e.path(), e.file_type().is_dir())),
        )
    }

    fn entry(&self, name: &str) -> Option<Box<dyn ContentEntry>> {
        let path = self.resolve(name)?;
        let metadata = fs::metadata(&path).ok()?;
        let modified = metadata.modified().map(millis_since_epoch).unwrap_or(0);
        Some(Box::new(FileEntry {
            name: name.to_string(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
            modified,
            path,
        }))
    }

    fn headers(&self) -> Option<Headers> {
        manifest::read(self)
    }

    fn origin(&self) -> String {
        self.root.display().to_string()
    }
}

struct FileEntry {
    name: String,
    path: PathBuf,
    size: u64,
    is_dir: bool,
    modified: u64,
}

impl ContentEntry for FileEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> u64 {
        self.modified
    }

    fn open_stream(&self) -> io::Result<EntryStream> {
        if self.is_dir {
            return Ok(Box::new(Cursor::new(Vec::new())));
        }
        Ok(Box::new(File::open(&self.path)?))
    }
}
