//! Layer runtime
//!
//! Orchestrates discovery, the host framework and persistence around the
//! [`Registry`]. Discovery and host calls always run outside the registry
//! lock; the registry only ever sees finished results.

use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use strata_api::{ContentEntry, HostFramework, UnitId};
use tracing::info;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::registry::Registry;

pub mod adapter;
pub mod commands;
pub mod deployment;
mod layers;
mod lifecycle;
mod storage;
mod units;

pub use adapter::{ConnectionAdapter, RUNTIME_SERVICE};
pub use commands::{COMMANDS_SERVICE, LayerCommands};
pub use deployment::{Deployment, LoaderCapability};
pub use layers::UNINSTALL_ATTEMPTS;

pub const BOOT_LAYER_NAME: &str = "boot";

pub struct Runtime {
    registry: Registry,
    deployment: Deployment,
    host: Arc<dyn HostFramework>,
    config: RwLock<RuntimeConfig>,

    /// Set by `initialize`; nothing is persisted before that
    storage: RwLock<Option<PathBuf>>,

    /// Serializes record writes
    persist_lock: Mutex<()>,
    initialized: AtomicBool,
}

impl Runtime {
    /// Discover the boot layer of `deployment` and build the runtime around it.
    pub fn new(deployment: Deployment, host: Arc<dyn HostFramework>) -> Result<Self> {
        let boot_paths = deployment.boot_paths().to_vec();
        let strategy = deployment.boot_strategy();
        let units = strategy.discover(&boot_paths)?;
        info!(
            "Discovered {} boot unit(s) with {} ({} deployment)",
            units.len(),
            strategy.name(),
            deployment.name()
        );

        let registry = Registry::new(
            BOOT_LAYER_NAME,
            deployment.capability().boot_loader(),
            boot_paths,
            units,
        );

        Ok(Self {
            registry,
            deployment,
            host,
            config: RwLock::new(RuntimeConfig::default()),
            storage: RwLock::new(None),
            persist_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
        })
    }

    /// Read-only queries and direct state transitions.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config.read().clone()
    }

    /// Resolve `name` the way the loader of `unit`'s layer does.
    ///
    /// Shared layers search every unit of the layer in discovery order;
    /// the other loader types only see the unit's own content.
    pub fn find_resource(&self, unit: UnitId, name: &str) -> Option<Box<dyn ContentEntry>> {
        self.registry
            .resource_scope(unit)?
            .iter()
            .find_map(|content| content.entry(name))
    }
}
