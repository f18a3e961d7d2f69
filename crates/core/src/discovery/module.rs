//! Host module system discovery.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use strata_api::ModuleScope;
use tracing::debug;

use super::{DiscoveredUnit, DiscoveryStrategy};
use crate::error::Result;
use crate::manifest;

/// One unit per module visible from `scope`, walking ancestor scopes until
/// the chain ends. A module shadows same-named modules of ancestor scopes.
pub struct HostModuleScan {
    scope: Arc<dyn ModuleScope>,
}

impl HostModuleScan {
    pub fn new(scope: Arc<dyn ModuleScope>) -> Self {
        Self { scope }
    }
}

impl DiscoveryStrategy for HostModuleScan {
    fn name(&self) -> &str {
        "host-modules"
    }

    fn discover(&self, _paths: &[PathBuf]) -> Result<Vec<DiscoveredUnit>> {
        let mut units = Vec::new();
        let mut seen = HashSet::new();
        let mut scope = Some(self.scope.clone());

        while let Some(current) = scope {
            for module in current.modules() {
                if !seen.insert(module.name.clone()) {
                    continue;
                }
                let identity = module.content.headers().as_ref().and_then(manifest::identity);
                let (name, header_version) = match identity {
                    Some((name, version)) => (name, Some(version)),
                    None => (module.name.clone(), None),
                };
                let version = module
                    .version
                    .clone()
                    .or(header_version)
                    .unwrap_or_else(|| manifest::DEFAULT_VERSION.to_string());
                debug!(
                    "Module {} in scope {} -> {}@{}",
                    module.name,
                    current.name(),
                    name,
                    version
                );
                units.push(DiscoveredUnit::new(name, version, module.content.clone()));
            }
            scope = current.parent();
        }
        Ok(units)
    }
}
