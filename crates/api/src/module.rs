//! View of a live host module system.

use std::fmt;
use std::sync::Arc;

use crate::content::ContentProvider;

/// A module visible in a host module scope.
#[derive(Clone)]
pub struct HostModule {
    pub name: String,
    pub version: Option<String>,
    pub content: Arc<dyn ContentProvider>,
}

impl fmt::Debug for HostModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostModule")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// One scope of the host module system. Scopes chain up to an empty root.
pub trait ModuleScope: Send + Sync {
    fn name(&self) -> &str;

    /// Modules defined directly in this scope
    fn modules(&self) -> Vec<HostModule>;

    fn parent(&self) -> Option<Arc<dyn ModuleScope>>;
}
