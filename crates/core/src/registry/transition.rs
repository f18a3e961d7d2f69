//! Content unit state transitions.
//!
//! ```text
//! Unconnected --connect--> Connected --install--> Installed
//!      ^                       |                      |
//!      +-------disconnect------+----------------------+
//! ```
//!
//! Every transition updates the location index under the write lock.

use std::sync::Arc;
use strata_api::{ContentProvider, HostHandle, UnitDescriptor, UnitId};
use tracing::debug;

use super::graph::{LayerGraph, UnitSlot};
use super::{Registry, SYSTEM_LOCATION};
use crate::error::{Result, StrataError};

/// Who is asking for a transition. Only the runtime may touch the system location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Caller {
    External,
    Runtime,
}

/// Outcome of the first half of an install.
pub(crate) enum InstallStep {
    /// Already installed at the resulting location
    Installed(HostHandle),
    /// Connected; the host framework must materialize a handle next.
    /// `fresh` is set when this call made the connection.
    Pending {
        descriptor: UnitDescriptor,
        fresh: bool,
    },
}

fn slot_mut(graph: &mut LayerGraph, unit: UnitId) -> Result<&mut UnitSlot> {
    graph
        .units
        .get_mut(&unit)
        .ok_or_else(|| StrataError::illegal_state(format!("unit {} is uninstalled", unit)))
}

/// Bind `unit` to `location`, failing on any conflicting binding.
fn bind(graph: &mut LayerGraph, unit: UnitId, location: &str) -> Result<bool> {
    let slot = slot_mut(graph, unit)?;
    match slot.location.as_deref() {
        Some(current) if current == location => return Ok(false),
        Some(current) => {
            return Err(StrataError::illegal_state(format!(
                "{}@{} is already connected to {}",
                slot.name, slot.version, current
            )));
        }
        None => {}
    }
    if let Some(owner) = graph.locations.get(location).copied() {
        let other = &graph.units[&owner];
        let what = if other.handle.is_some() { "installed" } else { "connected" };
        return Err(StrataError::illegal_state(format!(
            "location {} is already {} by {}@{}",
            location, what, other.name, other.version
        )));
    }

    let slot = slot_mut(graph, unit)?;
    slot.location = Some(location.to_string());
    graph.locations.insert(location.to_string(), unit);
    Ok(true)
}

impl Registry {
    /// Connect `unit` to `location`.
    ///
    /// Re-connecting to the location the unit already holds is a no-op.
    pub fn connect(&self, unit: UnitId, location: &str) -> Result<()> {
        if location == SYSTEM_LOCATION {
            return Err(StrataError::unsupported(
                "the system location is bound by the runtime only",
            ));
        }
        let mut graph = self.graph.write();
        if bind(&mut graph, unit, location)? {
            debug!("Connected unit {} to {}", unit, location);
        }
        Ok(())
    }

    /// Reserve the install location of `unit`: its current location, or
    /// `<prefix>:<name>` when unconnected.
    pub(crate) fn begin_install(&self, unit: UnitId, prefix: &str) -> Result<InstallStep> {
        let mut graph = self.graph.write();
        let slot = slot_mut(&mut graph, unit)?;
        if slot.framework_factory && slot.location.as_deref() == Some(SYSTEM_LOCATION) {
            return Err(StrataError::unsupported(
                "the system unit is provided by the host framework itself",
            ));
        }
        if let Some(handle) = &slot.handle {
            return Ok(InstallStep::Installed(handle.clone()));
        }
        let location = slot
            .location
            .clone()
            .unwrap_or_else(|| format!("{}:{}", prefix, slot.name));

        let fresh = bind(&mut graph, unit, &location)?;
        let slot = &graph.units[&unit];
        Ok(InstallStep::Pending {
            descriptor: UnitDescriptor {
                name: slot.name.clone(),
                version: slot.version.clone(),
                location,
                content: slot.content.clone(),
            },
            fresh,
        })
    }

    /// Record the handle for a pending install.
    ///
    /// Fails when the unit was disconnected or moved while the host was busy.
    pub(crate) fn finish_install(
        &self,
        unit: UnitId,
        location: &str,
        handle: HostHandle,
    ) -> Result<HostHandle> {
        let mut graph = self.graph.write();
        let slot = slot_mut(&mut graph, unit)?;
        if slot.location.as_deref() != Some(location) {
            return Err(StrataError::illegal_state(format!(
                "unit {} left {} during install",
                unit, location
            )));
        }
        // A concurrent install of the same location already stored its handle
        Ok(slot.handle.get_or_insert(handle).clone())
    }

    /// Undo a connection made by [`Registry::begin_install`] after the host failed.
    pub(crate) fn abort_install(&self, unit: UnitId, location: &str) {
        let mut graph = self.graph.write();
        let Some(slot) = graph.units.get_mut(&unit) else {
            return;
        };
        if slot.location.as_deref() == Some(location) && slot.handle.is_none() {
            slot.location = None;
            graph.locations.remove(location);
        }
    }

    /// Clear the location and handle of `unit`, returning the handle the host
    /// framework must tear down. Disconnecting an unconnected unit is a no-op.
    pub(crate) fn disconnect(&self, unit: UnitId, caller: Caller) -> Result<Option<HostHandle>> {
        let mut graph = self.graph.write();
        let slot = slot_mut(&mut graph, unit)?;
        if caller == Caller::External && slot.location.as_deref() == Some(SYSTEM_LOCATION) {
            return Err(StrataError::unsupported(
                "the system location can only be disconnected by the runtime",
            ));
        }
        let handle = slot.handle.take();
        slot.managed = false;
        if let Some(location) = slot.location.take() {
            graph.locations.remove(&location);
            debug!("Disconnected unit {} from {}", unit, location);
        }
        Ok(handle)
    }

    /// Host-initiated connection: mark the unit at `location` as externally
    /// managed and hand out its content.
    pub(crate) fn mark_managed(&self, location: &str) -> Option<Arc<dyn ContentProvider>> {
        let mut graph = self.graph.write();
        let unit = *graph.locations.get(location)?;
        let slot = graph.units.get_mut(&unit)?;
        slot.managed = true;
        Some(slot.content.clone())
    }
}
