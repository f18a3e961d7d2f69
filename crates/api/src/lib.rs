pub mod content;
pub mod host;
pub mod models;
pub mod module;
pub mod resource;

// Re-export commonly used types
pub use content::{ContentEntry, ContentProvider, EntryStream, Headers};
pub use host::{
    BoxError, ContentConnector, HostFramework, HostHandle, ServiceRegistrar, UnitDescriptor,
};
pub use models::*;
pub use module::{HostModule, ModuleScope};
pub use resource::{ResourceStore, StaticResources};
