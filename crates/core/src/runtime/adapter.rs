//! Bridge between the host framework's connector hooks and the runtime.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use strata_api::{BoxError, ContentConnector, ContentProvider, ServiceRegistrar};
use tracing::{debug, info};

use super::Runtime;
use super::commands::{COMMANDS_SERVICE, LayerCommands};
use crate::config::RuntimeConfig;

/// Service name the runtime itself is registered under.
pub const RUNTIME_SERVICE: &str = "strata.runtime";

pub struct ConnectionAdapter {
    runtime: Arc<Runtime>,
}

impl ConnectionAdapter {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl ContentConnector for ConnectionAdapter {
    fn initialize(
        &self,
        storage: &Path,
        config: &HashMap<String, String>,
    ) -> Result<(), BoxError> {
        let config = RuntimeConfig::from_map(config);
        let storage = RuntimeConfig::storage_dir(Some(storage));
        self.runtime.initialize(&storage, config)?;
        Ok(())
    }

    fn connect(&self, location: &str) -> Option<Arc<dyn ContentProvider>> {
        let content = self.runtime.registry().mark_managed(location);
        if content.is_none() {
            debug!("Nothing connected at {}", location);
        }
        content
    }

    fn system_started(&self, registrar: &dyn ServiceRegistrar) -> Result<(), BoxError> {
        registrar.register(RUNTIME_SERVICE, self.runtime.clone())?;
        registrar.register(
            COMMANDS_SERVICE,
            Arc::new(LayerCommands::new(self.runtime.clone())),
        )?;
        info!("Registered {} and {}", RUNTIME_SERVICE, COMMANDS_SERVICE);
        Ok(())
    }

    fn system_stopped(&self, registrar: &dyn ServiceRegistrar) {
        registrar.unregister(COMMANDS_SERVICE);
        registrar.unregister(RUNTIME_SERVICE);
        self.runtime.shutdown();
    }
}
