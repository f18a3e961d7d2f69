//! Directory-of-archives discovery.

use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_api::ContentProvider;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{DiscoveredUnit, DiscoveryStrategy, FRAMEWORK_FACTORY_MARKER};
use crate::content::{ArchiveContent, DirectoryContent};
use crate::error::Result;
use crate::manifest::{self, MANIFEST_PATH};

/// Scans directories for archives and exploded unit directories.
///
/// A path naming a single file is treated as one archive. Archives that
/// cannot be read are logged and skipped.
pub struct DirectoryScan {
    extensions: Vec<String>,
}

impl DirectoryScan {
    pub fn new() -> Self {
        Self {
            extensions: vec!["jar".to_string(), "zip".to_string()],
        }
    }

    pub fn with_extensions(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn candidates(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("discovery path {} does not exist", path.display()),
            ));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            let candidate = entry.path();
            if entry.file_type().is_dir() {
                if candidate.join(MANIFEST_PATH).is_file() {
                    found.push(candidate.to_path_buf());
                }
            } else if self.is_archive(candidate) {
                found.push(candidate.to_path_buf());
            }
        }
        Ok(found)
    }
}

impl Default for DirectoryScan {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryStrategy for DirectoryScan {
    fn name(&self) -> &str {
        "directory"
    }

    fn discover(&self, paths: &[PathBuf]) -> Result<Vec<DiscoveredUnit>> {
        let mut candidates = Vec::new();
        for path in paths {
            candidates.extend(self.candidates(path)?);
        }

        let units: Vec<DiscoveredUnit> = candidates
            .par_iter()
            .filter_map(|candidate| probe(candidate))
            .collect();

        debug!(
            "Directory scan of {} path(s) found {} unit(s)",
            paths.len(),
            units.len()
        );
        Ok(units)
    }
}

/// Open one archive or exploded directory and read its identity.
pub(crate) fn probe(path: &Path) -> Option<DiscoveredUnit> {
    let content: Arc<dyn ContentProvider> = if path.is_dir() {
        match DirectoryContent::new(path) {
            Ok(dir) => Arc::new(dir),
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", path.display(), e);
                return None;
            }
        }
    } else {
        let archive = ArchiveContent::closeable(path);
        if let Err(e) = archive.open() {
            warn!("Skipping unreadable archive {}: {}", path.display(), e);
            return None;
        }
        Arc::new(archive)
    };

    let unit = match content.headers().as_ref().and_then(manifest::identity) {
        Some((name, version)) => Some(DiscoveredUnit::new(name, version, content.clone())),
        None if content.contains(FRAMEWORK_FACTORY_MARKER) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "framework".to_string());
            Some(DiscoveredUnit::new(name, manifest::DEFAULT_VERSION, content.clone()))
        }
        None => {
            debug!("No component metadata in {}", path.display());
            None
        }
    };

    // Handles are re-acquired lazily on first real access
    if let Err(e) = content.close() {
        debug!("Failed to close {}: {}", path.display(), e);
    }
    unit
}
