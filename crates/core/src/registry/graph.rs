//! Arena tables behind the registry lock.
//!
//! Layers and units reference each other only through ids looked up here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use strata_api::{
    ContentProvider, HostHandle, LayerId, LayerInfo, LoaderType, UnitId, UnitInfo, UnitState,
};

use crate::discovery::DiscoveredUnit;

pub(crate) struct Layer {
    pub id: LayerId,
    pub name: String,
    pub loader: LoaderType,
    pub parents: Vec<LayerId>,
    pub children: BTreeSet<LayerId>,
    pub units: Vec<UnitId>,
    pub paths: Vec<PathBuf>,
}

impl Layer {
    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            id: self.id,
            name: self.name.clone(),
            loader: self.loader,
            parents: self.parents.clone(),
            children: self.children.iter().copied().collect(),
            units: self.units.clone(),
            paths: self.paths.clone(),
        }
    }
}

pub(crate) struct UnitSlot {
    pub id: UnitId,
    pub name: String,
    pub version: String,
    pub layer: LayerId,
    pub content: Arc<dyn ContentProvider>,
    pub location: Option<String>,
    pub handle: Option<HostHandle>,
    pub managed: bool,
    pub framework_factory: bool,
}

impl UnitSlot {
    pub fn state(&self) -> UnitState {
        match (&self.location, &self.handle) {
            (_, Some(_)) => UnitState::Installed,
            (Some(_), None) => UnitState::Connected,
            (None, None) => UnitState::Unconnected,
        }
    }

    pub fn info(&self) -> UnitInfo {
        UnitInfo {
            id: self.id,
            name: self.name.clone(),
            version: self.version.clone(),
            layer: self.layer,
            location: self.location.clone(),
            state: self.state(),
            managed: self.managed,
        }
    }
}

/// Layer description ready to be committed.
pub(crate) struct LayerSpec {
    pub id: Option<LayerId>,
    pub name: String,
    pub loader: LoaderType,
    pub parents: Vec<LayerId>,
    pub paths: Vec<PathBuf>,
}

#[derive(Default)]
pub(crate) struct LayerGraph {
    pub layers: BTreeMap<LayerId, Layer>,
    pub units: HashMap<UnitId, UnitSlot>,
    pub locations: HashMap<String, UnitId>,
    pub next_layer: u64,
    pub next_unit: u64,
}

impl LayerGraph {
    /// Commit a validated layer and its units. Parents must exist.
    pub fn commit_layer(&mut self, spec: LayerSpec, discovered: Vec<DiscoveredUnit>) -> LayerId {
        let id = spec.id.unwrap_or(LayerId(self.next_layer));
        self.next_layer = self.next_layer.max(id.0 + 1);

        let mut units = Vec::with_capacity(discovered.len());
        for unit in discovered {
            let unit_id = UnitId(self.next_unit);
            self.next_unit += 1;
            self.units.insert(
                unit_id,
                UnitSlot {
                    id: unit_id,
                    name: unit.name,
                    version: unit.version,
                    layer: id,
                    content: unit.content,
                    location: None,
                    handle: None,
                    managed: false,
                    framework_factory: unit.framework_factory,
                },
            );
            units.push(unit_id);
        }

        for parent in &spec.parents {
            if let Some(layer) = self.layers.get_mut(parent) {
                layer.children.insert(id);
            }
        }

        self.layers.insert(
            id,
            Layer {
                id,
                name: spec.name,
                loader: spec.loader,
                parents: spec.parents,
                children: BTreeSet::new(),
                units,
                paths: spec.paths,
            },
        );
        id
    }

    /// `root` and all its descendants, every child before its parents.
    pub fn post_order(&self, root: LayerId) -> Vec<LayerId> {
        fn visit(
            graph: &LayerGraph,
            id: LayerId,
            seen: &mut HashSet<LayerId>,
            out: &mut Vec<LayerId>,
        ) {
            if !seen.insert(id) {
                return;
            }
            if let Some(layer) = graph.layers.get(&id) {
                for child in &layer.children {
                    visit(graph, *child, seen, out);
                }
            }
            out.push(id);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        visit(self, root, &mut seen, &mut out);
        out
    }

    /// Depth-first search of `start` then its parents in declared order.
    pub fn find_content(&self, start: LayerId, name: &str) -> Option<&UnitSlot> {
        fn search<'a>(
            graph: &'a LayerGraph,
            id: LayerId,
            name: &str,
            seen: &mut HashSet<LayerId>,
        ) -> Option<&'a UnitSlot> {
            if !seen.insert(id) {
                return None;
            }
            let layer = graph.layers.get(&id)?;
            let local = layer
                .units
                .iter()
                .filter_map(|u| graph.units.get(u))
                .find(|u| u.name == name);
            if local.is_some() {
                return local;
            }
            layer
                .parents
                .iter()
                .find_map(|parent| search(graph, *parent, name, seen))
        }

        search(self, start, name, &mut HashSet::new())
    }

    /// Drop layers (already detached from the location index) from the tables.
    pub fn remove_layers(&mut self, ids: &[LayerId]) {
        for id in ids {
            let Some(layer) = self.layers.remove(id) else {
                continue;
            };
            for parent in &layer.parents {
                if let Some(p) = self.layers.get_mut(parent) {
                    p.children.remove(id);
                }
            }
            for unit in &layer.units {
                self.units.remove(unit);
            }
        }
    }

    /// Location index consistency check, used by tests.
    #[cfg(test)]
    pub fn index_is_consistent(&self) -> bool {
        let connected = self
            .units
            .values()
            .filter(|u| u.location.is_some())
            .count();
        connected == self.locations.len()
            && self.locations.iter().all(|(loc, id)| {
                self.units
                    .get(id)
                    .is_some_and(|u| u.location.as_deref() == Some(loc.as_str()))
            })
    }
}
