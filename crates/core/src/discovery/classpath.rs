//! Classpath-manifest discovery.

use rayon::prelude::*;
use std::path::PathBuf;
use tracing::debug;

use super::directory::probe;
use super::{DiscoveredUnit, DiscoveryStrategy};
use crate::error::Result;

/// Treats every path as one classpath entry (archive or directory) and keeps
/// the entries whose manifest carries component metadata.
///
/// Missing entries are ignored, as a classpath may name optional locations.
#[derive(Debug, Default)]
pub struct ClasspathScan;

impl ClasspathScan {
    pub fn new() -> Self {
        Self
    }

    /// Split a platform classpath string into entries.
    pub fn split(classpath: &str) -> Vec<PathBuf> {
        std::env::split_paths(classpath)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    }
}

impl DiscoveryStrategy for ClasspathScan {
    fn name(&self) -> &str {
        "classpath"
    }

    fn discover(&self, paths: &[PathBuf]) -> Result<Vec<DiscoveredUnit>> {
        let units: Vec<DiscoveredUnit> = paths
            .par_iter()
            .filter_map(|entry| {
                if !entry.exists() {
                    debug!("Classpath entry {} does not exist", entry.display());
                    return None;
                }
                probe(entry)
            })
            .collect();
        debug!(
            "Classpath scan of {} entries found {} unit(s)",
            paths.len(),
            units.len()
        );
        Ok(units)
    }
}
