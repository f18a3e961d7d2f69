//! Discovery strategies populating a layer's content units.
//!
//! Each strategy turns a set of source paths into [`DiscoveredUnit`]s without
//! touching the registry. The registry lock is never held while scanning.

pub mod classpath;
pub mod directory;
pub mod embedded;
pub mod module;

pub use classpath::ClasspathScan;
pub use directory::DirectoryScan;
pub use embedded::EmbeddedIndexScan;
pub use module::HostModuleScan;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use strata_api::ContentProvider;

use crate::error::Result;
use crate::manifest;

/// Entry whose presence marks the unit providing the host framework factory.
pub const FRAMEWORK_FACTORY_MARKER: &str =
    "META-INF/services/org.osgi.framework.launch.FrameworkFactory";

/// A unit found by a strategy, not yet owned by any layer.
#[derive(Clone)]
pub struct DiscoveredUnit {
    pub name: String,
    pub version: String,
    pub content: Arc<dyn ContentProvider>,
    /// Provides the host framework factory; bound to the system location at boot.
    pub framework_factory: bool,
}

impl DiscoveredUnit {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        content: Arc<dyn ContentProvider>,
    ) -> Self {
        let framework_factory = content.contains(FRAMEWORK_FACTORY_MARKER);
        Self {
            name: name.into(),
            version: version.into(),
            content,
            framework_factory,
        }
    }

    /// Build a unit from the manifest identity of `content`, if it has one.
    pub fn from_manifest(content: Arc<dyn ContentProvider>) -> Option<Self> {
        let headers = content.headers()?;
        let (name, version) = manifest::identity(&headers)?;
        Some(Self::new(name, version, content))
    }
}

impl fmt::Debug for DiscoveredUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredUnit")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("origin", &self.content.origin())
            .field("framework_factory", &self.framework_factory)
            .finish()
    }
}

/// Source-specific discovery logic.
pub trait DiscoveryStrategy: Send + Sync {
    /// Strategy name (for logging/debugging)
    fn name(&self) -> &str;

    /// Discover the units found under `paths`.
    ///
    /// Unreadable individual artifacts are skipped; an unreadable source path
    /// fails the whole call.
    fn discover(&self, paths: &[PathBuf]) -> Result<Vec<DiscoveredUnit>>;
}
