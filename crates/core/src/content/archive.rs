//! Zip archive content.
//!
//! The archive handle is acquired on first access. [`ArchiveContent::new`]
//! stays closed after `close()` until `open()` is called again, while
//! [`ArchiveContent::closeable`] transparently re-acquires the handle on the
//! next access.

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_api::{ContentEntry, ContentProvider, EntryStream, Headers};
use zip::ZipArchive;

use crate::manifest;

/// Upper bound on buffer reservation from the declared entry size.
const PREALLOC_LIMIT: u64 = 1 << 20;

enum ArchiveState {
    Unopened,
    Open(ZipArchive<File>),
    Closed,
}

struct ArchiveInner {
    path: PathBuf,
    reopen_after_close: bool,
    state: Mutex<ArchiveState>,
}

impl ArchiveInner {
    fn acquire(&self) -> io::Result<ZipArchive<File>> {
        let file = File::open(&self.path)?;
        ZipArchive::new(file).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Run `f` against the open archive, acquiring it first when allowed.
    fn with_archive<R>(&self, f: impl FnOnce(&mut ZipArchive<File>) -> R) -> io::Result<R> {
        let mut state = self.state.lock();
        match &mut *state {
            ArchiveState::Open(archive) => return Ok(f(archive)),
            ArchiveState::Closed if !self.reopen_after_close => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    format!("archive {} is closed", self.path.display()),
                ));
            }
            _ => {}
        }
        let mut archive = self.acquire()?;
        let result = f(&mut archive);
        *state = ArchiveState::Open(archive);
        Ok(result)
    }
}

/// Content backed by a zip archive on disk.
#[derive(Clone)]
pub struct ArchiveContent {
    inner: Arc<ArchiveInner>,
}

impl ArchiveContent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path.into(), false)
    }

    /// Variant that re-acquires its handle after an external `close()`.
    pub fn closeable(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path.into(), true)
    }

    fn with_policy(path: PathBuf, reopen_after_close: bool) -> Self {
        Self {
            inner: Arc::new(ArchiveInner {
                path,
                reopen_after_close,
                state: Mutex::new(ArchiveState::Unopened),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_open(&self) -> bool {
        matches!(&*self.inner.state.lock(), ArchiveState::Open(_))
    }
}

impl ContentProvider for ArchiveContent {
    fn open(&self) -> io::Result<()> {
        let mut state = self.inner.state.lock();
        if !matches!(&*state, ArchiveState::Open(_)) {
            *state = ArchiveState::Open(self.inner.acquire()?);
        }
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.inner.state.lock();
        *state = ArchiveState::Closed;
        Ok(())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        match self
            .inner
            .with_archive(|a| a.file_names().map(String::from).collect::<Vec<_>>())
        {
            Ok(names) => Box::new(names.into_iter()),
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", self.inner.path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }

    fn entry(&self, name: &str) -> Option<Box<dyn ContentEntry>> {
        let (size, modified) = self
            .inner
            .with_archive(|a| {
                a.by_name(name)
                    .ok()
                    .map(|f| (f.size(), f.last_modified().map(dos_time_millis).unwrap_or(0)))
            })
            .ok()
            .flatten()?;

        Some(Box::new(ArchiveEntry {
            inner: self.inner.clone(),
            name: name.to_string(),
            size,
            modified,
        }))
    }

    fn headers(&self) -> Option<Headers> {
        manifest::read(self)
    }

    fn origin(&self) -> String {
        self.inner.path.display().to_string()
    }
}

struct ArchiveEntry {
    inner: Arc<ArchiveInner>,
    name: String,
    size: u64,
    modified: u64,
}

impl ContentEntry for ArchiveEntry {
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
        let bytes = self.inner.with_archive(|a| -> io::Result<Vec<u8>> {
            let mut file = a
                .by_name(&self.name)
                .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
            let mut buf = Vec::with_capacity(self.size.min(PREALLOC_LIMIT) as usize);
            file.read_to_end(&mut buf)?;
            Ok(buf)
        })??;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Zip timestamps carry no zone and are read as UTC.
fn dos_time_millis(t: zip::DateTime) -> u64 {
    NaiveDateTime::try_from(t)
        .map(|dt| dt.and_utc().timestamp_millis().max(0) as u64)
        .unwrap_or(0)
}
