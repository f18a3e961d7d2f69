use super::*;
use strata_api::{HostHandle, LayerId, UnitInfo};
use tracing::{debug, warn};

use crate::error::StrataError;
use crate::registry::{Caller, InstallStep, SYSTEM_LOCATION};

pub(super) fn is_system_unit(unit: &UnitInfo) -> bool {
    unit.location.as_deref() == Some(SYSTEM_LOCATION)
}

impl Runtime {
    /// Connect `unit` to `location` without installing it.
    pub fn connect(&self, unit: UnitId, location: &str) -> Result<()> {
        self.registry.connect(unit, location)
    }

    /// Install `unit` through the host framework.
    ///
    /// An unconnected unit is connected to `<prefix>:<name>` first, with the
    /// configured prefix when `prefix` is `None`. Installing an installed unit
    /// returns its existing handle. When the host fails, a connection made by
    /// this call is rolled back.
    pub fn install(&self, unit: UnitId, prefix: Option<&str>) -> Result<HostHandle> {
        let prefix = match prefix {
            Some(prefix) => prefix.to_string(),
            None => self.config.read().install_prefix.clone(),
        };

        let (descriptor, fresh) = match self.registry.begin_install(unit, &prefix)? {
            InstallStep::Installed(handle) => return Ok(handle),
            InstallStep::Pending { descriptor, fresh } => (descriptor, fresh),
        };

        let handle = match self.host.install(&descriptor) {
            Ok(handle) => handle,
            Err(e) => {
                if fresh {
                    self.registry.abort_install(unit, &descriptor.location);
                }
                return Err(StrataError::Host(format!(
                    "installing {} at {}: {}",
                    descriptor.name, descriptor.location, e
                )));
            }
        };

        match self
            .registry
            .finish_install(unit, &descriptor.location, handle.clone())
        {
            Ok(handle) => {
                debug!(
                    "Installed {}@{} as {}",
                    descriptor.name, descriptor.version, handle
                );
                Ok(handle)
            }
            Err(e) => {
                // Disconnected while the host was busy
                self.teardown(&handle);
                Err(e)
            }
        }
    }

    /// Install every unit of `layer`, stopping at the first failure.
    /// The system unit is skipped.
    pub fn install_layer(&self, layer: LayerId, prefix: Option<&str>) -> Result<Vec<HostHandle>> {
        if self.registry.layer(layer).is_none() {
            return Err(StrataError::illegal_state(format!(
                "layer {} is not installed",
                layer
            )));
        }
        self.registry
            .layer_units(layer)
            .iter()
            .filter(|unit| !is_system_unit(unit))
            .map(|unit| self.install(unit.id, prefix))
            .collect()
    }

    /// Disconnect `unit`, tearing down its host handle if it was installed.
    ///
    /// The registry is updated first; a failed host teardown is reported but
    /// the unit stays disconnected.
    pub fn disconnect(&self, unit: UnitId) -> Result<()> {
        if let Some(handle) = self.registry.disconnect(unit, Caller::External)? {
            self.host.uninstall(&handle)?;
        }
        Ok(())
    }

    /// Runtime-side disconnect used while removing layers. Never fails.
    pub(super) fn release(&self, unit: UnitId) {
        match self.registry.disconnect(unit, Caller::Runtime) {
            Ok(Some(handle)) => self.teardown(&handle),
            Ok(None) => {}
            // Already removed by a concurrent uninstall
            Err(e) => debug!("Skipping release of unit {}: {}", unit, e),
        }
    }

    fn teardown(&self, handle: &HostHandle) {
        if let Err(e) = self.host.uninstall(handle) {
            warn!("Host failed to uninstall {}: {}", handle, e);
        }
    }
}
