//! Deployment modes as a (discovery strategy, loader capability) pair.

use std::path::PathBuf;
use std::sync::Arc;
use strata_api::{LoaderType, ModuleScope, ResourceStore};

use crate::discovery::{
    ClasspathScan, DirectoryScan, DiscoveryStrategy, EmbeddedIndexScan, HostModuleScan,
};

/// What layers of a deployment can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderCapability {
    boot: LoaderType,
    supported: Vec<LoaderType>,
    dynamic_layers: bool,
}

impl LoaderCapability {
    pub fn new(boot: LoaderType, supported: Vec<LoaderType>, dynamic_layers: bool) -> Self {
        Self {
            boot,
            supported,
            dynamic_layers,
        }
    }

    /// A single fixed layer sharing one scope.
    pub fn fixed() -> Self {
        Self::new(LoaderType::Shared, vec![LoaderType::Shared], false)
    }

    pub fn boot_loader(&self) -> LoaderType {
        self.boot
    }

    pub fn supports(&self, loader: LoaderType) -> bool {
        self.supported.contains(&loader)
    }

    pub fn supported(&self) -> &[LoaderType] {
        &self.supported
    }

    pub fn dynamic_layers(&self) -> bool {
        self.dynamic_layers
    }
}

pub struct Deployment {
    name: String,
    boot: Box<dyn DiscoveryStrategy>,
    boot_paths: Vec<PathBuf>,
    layers: Option<Box<dyn DiscoveryStrategy>>,
    capability: LoaderCapability,
}

impl Deployment {
    /// Fully custom deployment. `layers` is the strategy used for added
    /// layers; without one, adding layers is unsupported.
    pub fn new(
        name: impl Into<String>,
        boot: Box<dyn DiscoveryStrategy>,
        boot_paths: Vec<PathBuf>,
        layers: Option<Box<dyn DiscoveryStrategy>>,
        capability: LoaderCapability,
    ) -> Self {
        let capability = if layers.is_none() {
            LoaderCapability {
                dynamic_layers: false,
                ..capability
            }
        } else {
            capability
        };
        Self {
            name: name.into(),
            boot,
            boot_paths,
            layers,
            capability,
        }
    }

    /// Live module system: the boot layer mirrors the host's module scopes,
    /// added layers are scanned from directories of archives.
    pub fn module_system(scope: Arc<dyn ModuleScope>) -> Self {
        Self::new(
            "module-system",
            Box::new(HostModuleScan::new(scope)),
            Vec::new(),
            Some(Box::new(DirectoryScan::new())),
            LoaderCapability::new(LoaderType::HostDelegated, LoaderType::ALL.to_vec(), true),
        )
    }

    /// Boot layer scanned from a directory of archives; more directories can
    /// be added as layers.
    pub fn directory(boot_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            "directory",
            Box::new(DirectoryScan::new()),
            vec![boot_dir.into()],
            Some(Box::new(DirectoryScan::new())),
            LoaderCapability::new(
                LoaderType::PerUnit,
                vec![LoaderType::Shared, LoaderType::PerUnit],
                true,
            ),
        )
    }

    /// Plain classpath: one fixed shared layer.
    pub fn classpath(entries: Vec<PathBuf>) -> Self {
        Self::new(
            "classpath",
            Box::new(ClasspathScan::new()),
            entries,
            None,
            LoaderCapability::fixed(),
        )
    }

    /// Ahead-of-time image with an embedded index and no filesystem access.
    pub fn embedded(store: Arc<dyn ResourceStore>) -> Self {
        Self::new(
            "embedded",
            Box::new(EmbeddedIndexScan::new(store)),
            Vec::new(),
            None,
            LoaderCapability::fixed(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> &LoaderCapability {
        &self.capability
    }

    pub(crate) fn boot_strategy(&self) -> &dyn DiscoveryStrategy {
        self.boot.as_ref()
    }

    pub(crate) fn boot_paths(&self) -> &[PathBuf] {
        &self.boot_paths
    }

    pub(crate) fn layer_strategy(&self) -> Option<&dyn DiscoveryStrategy> {
        self.layers.as_deref()
    }
}
