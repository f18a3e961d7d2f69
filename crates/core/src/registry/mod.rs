//! Layer graph registry.
//!
//! Single source of truth for the layer DAG, the content units each layer
//! owns and the location index. All state sits in one [`LayerGraph`] behind
//! one read/write lock: queries take the read lock, structural changes and
//! unit transitions take the write lock. No I/O happens under the write lock.

mod graph;
mod record;
mod transition;
mod uninstall;

pub use record::{GraphRecord, LayerRecord, RECORD_FILE, RECORD_VERSION};

pub(crate) use graph::LayerSpec;
pub(crate) use transition::{Caller, InstallStep};

use graph::LayerGraph;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use strata_api::{ContentProvider, LayerId, LayerInfo, LoaderType, UnitId, UnitInfo};
use tracing::{info, warn};

use crate::discovery::DiscoveredUnit;
use crate::error::{Result, StrataError};

/// Location reserved for the unit providing the host framework factory.
pub const SYSTEM_LOCATION: &str = "System Bundle";

pub struct Registry {
    graph: RwLock<LayerGraph>,
}

impl Registry {
    /// Create a registry holding only the boot layer.
    ///
    /// The first boot unit carrying the framework factory marker is bound to
    /// [`SYSTEM_LOCATION`].
    pub(crate) fn new(
        name: &str,
        loader: LoaderType,
        paths: Vec<PathBuf>,
        units: Vec<DiscoveredUnit>,
    ) -> Self {
        let mut graph = LayerGraph::default();
        graph.commit_layer(
            LayerSpec {
                id: Some(LayerId::BOOT),
                name: name.to_string(),
                loader,
                parents: Vec::new(),
                paths,
            },
            units,
        );

        let factories: Vec<UnitId> = graph.layers[&LayerId::BOOT]
            .units
            .iter()
            .copied()
            .filter(|id| graph.units[id].framework_factory)
            .collect();
        if let Some(first) = factories.first() {
            if let Some(slot) = graph.units.get_mut(first) {
                slot.location = Some(SYSTEM_LOCATION.to_string());
                info!("Bound {}@{} to the system location", slot.name, slot.version);
            }
            graph.locations.insert(SYSTEM_LOCATION.to_string(), *first);
        }
        for extra in factories.iter().skip(1) {
            warn!(
                "Ignoring additional framework factory unit {}",
                graph.units[extra].name
            );
        }

        Self {
            graph: RwLock::new(graph),
        }
    }

    /// Check parents before any discovery work is spent on a new layer.
    /// Returns them in declared order with duplicates removed.
    pub(crate) fn validate_parents(&self, parents: &[LayerId]) -> Result<Vec<LayerId>> {
        let graph = self.graph.read();
        Self::checked_parents(&graph, parents)
    }

    fn checked_parents(graph: &LayerGraph, parents: &[LayerId]) -> Result<Vec<LayerId>> {
        if parents.is_empty() {
            return Err(StrataError::illegal_state(
                "a layer needs at least one parent",
            ));
        }
        let mut ordered: Vec<LayerId> = Vec::with_capacity(parents.len());
        for parent in parents {
            if !graph.layers.contains_key(parent) {
                return Err(StrataError::illegal_state(format!(
                    "parent layer {} is not installed",
                    parent
                )));
            }
            if !ordered.contains(parent) {
                ordered.push(*parent);
            }
        }
        Ok(ordered)
    }

    /// Commit a discovered layer, allocating a fresh id unless `spec.id` is set.
    pub(crate) fn add_layer(&self, spec: LayerSpec, units: Vec<DiscoveredUnit>) -> Result<LayerId> {
        let mut graph = self.graph.write();
        let parents = Self::checked_parents(&graph, &spec.parents)?;
        if let Some(id) = spec.id {
            if graph.layers.contains_key(&id) {
                return Err(StrataError::illegal_state(format!(
                    "layer id {} is already in use",
                    id
                )));
            }
        }
        let unit_count = units.len();
        let id = graph.commit_layer(LayerSpec { parents, ..spec }, units);
        let layer = &graph.layers[&id];
        info!(
            "Added layer {} '{}' ({}, {} unit(s), parents {:?})",
            id, layer.name, layer.loader, unit_count, layer.parents
        );
        Ok(id)
    }

    /// Raise the id counter so future layers never reuse persisted ids.
    pub(crate) fn reserve_ids(&self, next_id: u64) {
        let mut graph = self.graph.write();
        graph.next_layer = graph.next_layer.max(next_id);
    }

    pub fn next_layer_id(&self) -> LayerId {
        LayerId(self.graph.read().next_layer)
    }

    pub fn layer(&self, id: LayerId) -> Option<LayerInfo> {
        self.graph.read().layers.get(&id).map(|l| l.info())
    }

    /// All layers in id order
    pub fn layers(&self) -> Vec<LayerInfo> {
        self.graph.read().layers.values().map(|l| l.info()).collect()
    }

    pub fn unit(&self, id: UnitId) -> Option<UnitInfo> {
        self.graph.read().units.get(&id).map(|u| u.info())
    }

    /// Units of `layer` in discovery order
    pub fn layer_units(&self, layer: LayerId) -> Vec<UnitInfo> {
        let graph = self.graph.read();
        graph
            .layers
            .get(&layer)
            .map(|l| {
                l.units
                    .iter()
                    .filter_map(|u| graph.units.get(u))
                    .map(|u| u.info())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All units, grouped by layer id
    pub fn units(&self) -> Vec<UnitInfo> {
        let graph = self.graph.read();
        graph
            .layers
            .values()
            .flat_map(|l| l.units.iter())
            .filter_map(|u| graph.units.get(u))
            .map(|u| u.info())
            .collect()
    }

    pub fn content_count(&self) -> usize {
        self.graph.read().units.len()
    }

    pub fn content(&self, id: UnitId) -> Option<Arc<dyn ContentProvider>> {
        self.graph.read().units.get(&id).map(|u| u.content.clone())
    }

    /// Nearest unit named `name`, searching `layer` first and then its
    /// parents depth-first in declared order.
    pub fn find_content(&self, layer: LayerId, name: &str) -> Option<UnitInfo> {
        self.graph
            .read()
            .find_content(layer, name)
            .map(|u| u.info())
    }

    pub fn find_by_location(&self, location: &str) -> Option<UnitInfo> {
        let graph = self.graph.read();
        graph
            .locations
            .get(location)
            .and_then(|id| graph.units.get(id))
            .map(|u| u.info())
    }

    /// Contents a unit resolves resources through, in lookup order.
    pub(crate) fn resource_scope(&self, unit: UnitId) -> Option<Vec<Arc<dyn ContentProvider>>> {
        let graph = self.graph.read();
        let slot = graph.units.get(&unit)?;
        let layer = graph.layers.get(&slot.layer)?;
        let scope = match layer.loader {
            LoaderType::Shared => layer
                .units
                .iter()
                .filter_map(|u| graph.units.get(u))
                .map(|u| u.content.clone())
                .collect(),
            LoaderType::PerUnit | LoaderType::HostDelegated => vec![slot.content.clone()],
        };
        Some(scope)
    }

    /// Every content provider currently owned by the registry.
    pub(crate) fn all_contents(&self) -> Vec<Arc<dyn ContentProvider>> {
        self.graph
            .read()
            .units
            .values()
            .map(|u| u.content.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn index_is_consistent(&self) -> bool {
        self.graph.read().index_is_consistent()
    }
}
