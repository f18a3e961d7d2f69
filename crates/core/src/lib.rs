pub mod config;
pub mod content;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod registry;
pub mod runtime;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, StrataError};
pub use registry::{Registry, SYSTEM_LOCATION};
pub use runtime::{ConnectionAdapter, Deployment, LayerCommands, LoaderCapability, Runtime};
