//! Embedded-index discovery.
//!
//! The index is newline-delimited text, repeating per unit:
//!
//! ```text
//! ATOMOS_BUNDLE
//! <index-id>
//! <symbolic-name>
//! <version>
//! <entry-path>
//! ...
//! ```
//!
//! A block ends at the next marker or at end of input. No filesystem access
//! happens here; entry bytes come from the [`ResourceStore`].

use std::path::PathBuf;
use std::sync::Arc;
use strata_api::ResourceStore;
use tracing::{debug, warn};

use super::{DiscoveredUnit, DiscoveryStrategy, FRAMEWORK_FACTORY_MARKER};
use crate::content::EmbeddedContent;
use crate::error::{Result, StrataError};

pub const BLOCK_MARKER: &str = "ATOMOS_BUNDLE";
pub const INDEX_RESOURCE: &str = "atomos/bundles.index";

/// One parsed index block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBlock {
    pub id: String,
    pub name: String,
    pub version: String,
    pub entries: Vec<String>,
}

/// Parse an embedded index.
pub fn parse_index(text: &str) -> Result<Vec<IndexBlock>> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .enumerate();
    let mut blocks: Vec<IndexBlock> = Vec::new();

    while let Some((n, line)) = lines.next() {
        if line == BLOCK_MARKER {
            let mut header = [""; 3];
            for slot in header.iter_mut() {
                match lines.next() {
                    Some((_, value)) if value != BLOCK_MARKER => *slot = value.trim(),
                    _ => {
                        return Err(StrataError::Parsing(format!(
                            "truncated index block starting at record {}",
                            n + 1
                        )));
                    }
                }
            }
            let [id, name, version] = header;
            blocks.push(IndexBlock {
                id: id.to_string(),
                name: name.to_string(),
                version: version.to_string(),
                entries: Vec::new(),
            });
        } else if let Some(block) = blocks.last_mut() {
            block.entries.push(line.to_string());
        } else {
            return Err(StrataError::Parsing(format!(
                "entry {:?} precedes the first {} marker",
                line, BLOCK_MARKER
            )));
        }
    }
    Ok(blocks)
}

/// Discovers units from an index baked into a resource store.
pub struct EmbeddedIndexScan {
    store: Arc<dyn ResourceStore>,
    index_resource: String,
}

impl EmbeddedIndexScan {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_index(store, INDEX_RESOURCE)
    }

    pub fn with_index(store: Arc<dyn ResourceStore>, index_resource: impl Into<String>) -> Self {
        Self {
            store,
            index_resource: index_resource.into(),
        }
    }
}

impl DiscoveryStrategy for EmbeddedIndexScan {
    fn name(&self) -> &str {
        "embedded-index"
    }

    fn discover(&self, _paths: &[PathBuf]) -> Result<Vec<DiscoveredUnit>> {
        let Some(bytes) = self.store.resource(&self.index_resource) else {
            warn!("No embedded index at {}", self.index_resource);
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        let blocks = parse_index(&text)?;

        let units = blocks
            .into_iter()
            .map(|block| {
                let framework_factory =
                    block.entries.iter().any(|e| e == FRAMEWORK_FACTORY_MARKER);
                debug!(
                    "Indexed unit {}@{} ({} entries)",
                    block.name,
                    block.version,
                    block.entries.len()
                );
                let content = Arc::new(EmbeddedContent::new(
                    block.id,
                    block.entries,
                    self.store.clone(),
                ));
                DiscoveredUnit {
                    name: block.name,
                    version: block.version,
                    content,
                    framework_factory,
                }
            })
            .collect();
        Ok(units)
    }
}
