//! Host framework collaborators.
//!
//! The framework that wires and activates components is never implemented
//! here; it is injected through these traits.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::content::ContentProvider;

/// Error type for collaborator operations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque handle the host framework returns for an installed unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostHandle {
    pub id: u64,
    pub location: String,
}

impl HostHandle {
    pub fn new(id: u64, location: impl Into<String>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.location, self.id)
    }
}

/// What the host framework receives when asked to materialize a unit.
#[derive(Clone)]
pub struct UnitDescriptor {
    pub name: String,
    pub version: String,
    pub location: String,
    pub content: Arc<dyn ContentProvider>,
}

impl fmt::Debug for UnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("location", &self.location)
            .field("content", &self.content.origin())
            .finish()
    }
}

/// The component framework performing installation and teardown.
pub trait HostFramework: Send + Sync {
    /// Materialize the unit at `descriptor.location` and return its handle.
    /// Installing an already-installed location should return the same handle.
    fn install(&self, descriptor: &UnitDescriptor) -> Result<HostHandle, BoxError>;

    /// Tear down a previously installed unit
    fn uninstall(&self, handle: &HostHandle) -> Result<(), BoxError>;
}

/// Service registry of the host framework, used by the system start/stop hooks.
pub trait ServiceRegistrar: Send + Sync {
    fn register(&self, name: &str, service: Arc<dyn Any + Send + Sync>) -> Result<(), BoxError>;

    fn unregister(&self, name: &str);
}

/// Hooks the host framework calls on its content connector.
pub trait ContentConnector: Send + Sync {
    /// Called once before the host starts, with its storage area and
    /// configuration properties.
    fn initialize(
        &self,
        storage: &Path,
        config: &HashMap<String, String>,
    ) -> Result<(), BoxError>;

    /// Host-initiated connection of `location`. Returns the content to
    /// materialize, or `None` when nothing is connected there.
    fn connect(&self, location: &str) -> Option<Arc<dyn ContentProvider>>;

    fn system_started(&self, registrar: &dyn ServiceRegistrar) -> Result<(), BoxError>;

    fn system_stopped(&self, registrar: &dyn ServiceRegistrar);
}
