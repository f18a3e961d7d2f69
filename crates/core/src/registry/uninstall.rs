//! Cascading layer removal.
//!
//! Removal runs in two phases. The plan lists the layer and its descendants
//! children first, together with their connected units. Once the runtime has
//! disconnected those units, the commit re-validates under the write lock
//! and drops every planned layer at once, so a failure never leaves a
//! half-removed graph behind.

use std::sync::Arc;
use strata_api::{ContentProvider, LayerId, UnitId};
use tracing::info;

use super::Registry;
use super::graph::LayerGraph;
use crate::error::{Result, StrataError};

pub(crate) struct UninstallPlan {
    /// Layer and descendants, every child before its parents
    pub layers: Vec<LayerId>,
    /// Connected units in the same order as their layers
    pub connected: Vec<UnitId>,
}

pub(crate) struct RemovedLayers {
    pub layers: Vec<LayerId>,
    /// Contents of the removed units, to be closed outside the lock
    pub contents: Vec<Arc<dyn ContentProvider>>,
}

fn plan(graph: &LayerGraph, id: LayerId) -> Result<UninstallPlan> {
    if id.is_boot() {
        return Err(StrataError::unsupported("the boot layer cannot be uninstalled"));
    }
    if !graph.layers.contains_key(&id) {
        return Err(StrataError::illegal_state(format!(
            "layer {} is not installed",
            id
        )));
    }
    let layers = graph.post_order(id);
    let connected = layers
        .iter()
        .filter_map(|l| graph.layers.get(l))
        .flat_map(|l| l.units.iter())
        .filter(|u| graph.units.get(u).is_some_and(|s| s.location.is_some()))
        .copied()
        .collect();
    Ok(UninstallPlan { layers, connected })
}

impl Registry {
    pub(crate) fn plan_uninstall(&self, id: LayerId) -> Result<UninstallPlan> {
        plan(&self.graph.read(), id)
    }

    /// Drop `id` and its descendants.
    ///
    /// Returns `None` without touching the graph when a unit of the subtree is
    /// still connected (a concurrent connect or a new child layer); the caller
    /// disconnects again and retries.
    pub(crate) fn commit_uninstall(&self, id: LayerId) -> Result<Option<RemovedLayers>> {
        let mut graph = self.graph.write();
        let plan = plan(&graph, id)?;
        if !plan.connected.is_empty() {
            return Ok(None);
        }

        let contents = plan
            .layers
            .iter()
            .filter_map(|l| graph.layers.get(l))
            .flat_map(|l| l.units.iter())
            .filter_map(|u| graph.units.get(u))
            .map(|u| u.content.clone())
            .collect();
        graph.remove_layers(&plan.layers);
        info!("Uninstalled layer {} and {} descendant(s)", id, plan.layers.len() - 1);

        Ok(Some(RemovedLayers {
            layers: plan.layers,
            contents,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Caller;
    use crate::registry::tests::{boot, spec, unit};

    #[test]
    fn test_post_order_plan_and_commit() {
        let registry = boot(vec![unit("root", "1")]);
        let a = registry
            .add_layer(spec("a", &[LayerId::BOOT]), vec![unit("a", "1")])
            .unwrap();
        let b = registry.add_layer(spec("b", &[a]), vec![unit("b", "1")]).unwrap();
        let c = registry.add_layer(spec("c", &[b]), vec![unit("c", "1")]).unwrap();
        let other = registry
            .add_layer(spec("other", &[LayerId::BOOT]), vec![unit("o", "1")])
            .unwrap();
        // Diamond child of a subtree member and an unrelated layer
        let d = registry.add_layer(spec("d", &[other, b]), vec![]).unwrap();

        let c_unit = registry.layer(c).unwrap().units[0];
        registry.connect(c_unit, "c").unwrap();

        let plan = registry.plan_uninstall(a).unwrap();
        assert_eq!(plan.layers.last(), Some(&a));
        let pos = |id| plan.layers.iter().position(|l| *l == id).unwrap();
        assert!(pos(c) < pos(b) && pos(d) < pos(b) && pos(b) < pos(a));
        assert_eq!(plan.connected, vec![c_unit]);

        // Still connected: commit refuses and leaves everything in place
        assert!(registry.commit_uninstall(a).unwrap().is_none());
        assert_eq!(registry.layers().len(), 6);

        registry.disconnect(c_unit, Caller::External).unwrap();
        let removed = registry.commit_uninstall(a).unwrap().unwrap();
        assert_eq!(removed.layers.len(), 4);
        assert_eq!(removed.contents.len(), 3);

        let remaining = registry.layers();
        assert_eq!(remaining.len(), 2);
        for layer in remaining {
            for gone in [a, b, c, d] {
                assert!(!layer.parents.contains(&gone));
                assert!(!layer.children.contains(&gone));
            }
        }
        assert_eq!(registry.content_count(), 2);
        assert!(registry.index_is_consistent());
    }

    #[test]
    fn test_uninstall_validation() {
        let registry = boot(vec![]);
        assert!(matches!(
            registry.plan_uninstall(LayerId::BOOT),
            Err(StrataError::Unsupported(_))
        ));
        assert!(matches!(
            registry.commit_uninstall(LayerId(5)),
            Err(StrataError::IllegalState(_))
        ));
    }
}
