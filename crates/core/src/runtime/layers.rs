use super::*;
use strata_api::{LayerId, LoaderType};
use tracing::debug;

use crate::discovery::{DiscoveredUnit, DiscoveryStrategy};
use crate::error::StrataError;
use crate::registry::LayerSpec;

/// Disconnect-and-commit rounds before an uninstall gives up.
pub const UNINSTALL_ATTEMPTS: usize = 8;

/// Discover units for a child layer. Framework factory units only belong to
/// the boot layer.
fn discover_children(
    strategy: &dyn DiscoveryStrategy,
    paths: &[PathBuf],
) -> Result<Vec<DiscoveredUnit>> {
    let units = strategy.discover(paths)?;
    Ok(units
        .into_iter()
        .filter(|unit| {
            if unit.framework_factory {
                debug!(
                    "Skipping framework factory unit {} outside the boot layer",
                    unit.name
                );
            }
            !unit.framework_factory
        })
        .collect())
}

impl Runtime {
    /// Add a layer named `name` under `parents`, populated from `paths`.
    ///
    /// Parents are searched in the given order during lookups. The new
    /// graph is persisted before returning.
    pub fn add_layer(
        &self,
        parents: &[LayerId],
        name: &str,
        loader: LoaderType,
        paths: &[PathBuf],
    ) -> Result<LayerId> {
        let id = self.create_layer(None, parents, name, loader, paths)?;
        self.persist();
        Ok(id)
    }

    pub(super) fn create_layer(
        &self,
        id: Option<LayerId>,
        parents: &[LayerId],
        name: &str,
        loader: LoaderType,
        paths: &[PathBuf],
    ) -> Result<LayerId> {
        let strategy = self.layer_strategy()?;
        if !self.deployment.capability().supports(loader) {
            return Err(StrataError::unsupported(format!(
                "{} deployments do not support {} layers",
                self.deployment.name(),
                loader
            )));
        }
        let parents = self.registry.validate_parents(parents)?;

        let units = discover_children(strategy, paths)?;
        self.registry.add_layer(
            LayerSpec {
                id,
                name: name.to_string(),
                loader,
                parents,
                paths: paths.to_vec(),
            },
            units,
        )
    }

    pub(super) fn layer_strategy(&self) -> Result<&dyn DiscoveryStrategy> {
        self.deployment
            .layer_strategy()
            .filter(|_| self.deployment.capability().dynamic_layers())
            .ok_or_else(|| {
                StrataError::unsupported(format!(
                    "{} deployments cannot add layers",
                    self.deployment.name()
                ))
            })
    }

    /// Remove `id` and every layer descending from it.
    ///
    /// Connected units of the subtree are disconnected and torn down in the
    /// host framework, children before parents, before the layers are
    /// dropped. Returns the removed layer ids, children first.
    ///
    /// Fails with `IllegalState`, leaving the graph in place, when units keep
    /// getting reconnected for [`UNINSTALL_ATTEMPTS`] rounds.
    pub fn uninstall_layer(&self, id: LayerId) -> Result<Vec<LayerId>> {
        for _ in 0..UNINSTALL_ATTEMPTS {
            let plan = self.registry.plan_uninstall(id)?;
            for unit in &plan.connected {
                self.release(*unit);
            }

            // A unit connected after the plan was taken sends us round again
            if let Some(removed) = self.registry.commit_uninstall(id)? {
                for content in &removed.contents {
                    if let Err(e) = content.close() {
                        debug!("Failed to close {}: {}", content.origin(), e);
                    }
                }
                self.persist();
                return Ok(removed.layers);
            }
        }
        Err(StrataError::illegal_state(format!(
            "layer {} still has connected units after {} attempts",
            id, UNINSTALL_ATTEMPTS
        )))
    }
}
