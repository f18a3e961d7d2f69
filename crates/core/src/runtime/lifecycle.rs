use super::*;
use std::path::Path;
use std::sync::atomic::Ordering;
use strata_api::{LayerId, LoaderType};
use tracing::{debug, warn};

use crate::config::MODULES_LAYER;
use crate::error::StrataError;
use crate::registry::GraphRecord;

impl Runtime {
    /// Bind the runtime to its storage directory and configuration.
    ///
    /// Replays the persisted layer graph (reusing its layer ids), adds the
    /// configured modules layer and installs the boot units when asked to.
    /// Can run only once.
    pub fn initialize(&self, storage: &Path, config: RuntimeConfig) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(StrataError::illegal_state("runtime is already initialized"));
        }
        std::fs::create_dir_all(storage)?;
        *self.config.write() = config.clone();

        if let Some(record) = GraphRecord::load(storage)? {
            self.restore(&record);
        }
        *self.storage.write() = Some(storage.to_path_buf());

        if let Some(dir) = &config.modules_dir {
            self.add_modules_layer(dir);
        }
        self.persist();

        if config.install_boot {
            self.install_boot();
        }
        info!(
            "Runtime initialized with storage {} ({} layer(s), {} unit(s))",
            storage.display(),
            self.registry.layers().len(),
            self.registry.content_count()
        );
        Ok(())
    }

    /// Rebuild persisted layers in id order. Layers that cannot be rebuilt
    /// are skipped along with everything below them.
    fn restore(&self, record: &GraphRecord) {
        self.registry.reserve_ids(record.next_id);

        let layers = record.restorable();
        if layers.is_empty() {
            return;
        }
        if let Err(e) = self.layer_strategy() {
            warn!("Dropping {} persisted layer(s): {}", layers.len(), e);
            return;
        }

        let mut restored = 0;
        for layer in &layers {
            match self.create_layer(
                Some(layer.id),
                &layer.parents,
                &layer.name,
                layer.loader,
                &layer.paths,
            ) {
                Ok(_) => restored += 1,
                Err(e) => warn!(
                    "Skipping persisted layer {} '{}': {}",
                    layer.id, layer.name, e
                ),
            }
        }
        info!("Restored {} of {} persisted layer(s)", restored, layers.len());
    }

    fn add_modules_layer(&self, dir: &Path) {
        if self
            .registry
            .layers()
            .iter()
            .any(|layer| layer.name == MODULES_LAYER)
        {
            debug!("Modules layer already restored");
            return;
        }
        match self.create_layer(
            None,
            &[LayerId::BOOT],
            MODULES_LAYER,
            LoaderType::PerUnit,
            &[dir.to_path_buf()],
        ) {
            Ok(id) => info!("Added modules layer {} from {}", id, dir.display()),
            Err(e) => warn!("Cannot add modules layer from {}: {}", dir.display(), e),
        }
    }

    fn install_boot(&self) {
        let mut installed = 0;
        for unit in self.registry.layer_units(LayerId::BOOT) {
            if units::is_system_unit(&unit) {
                continue;
            }
            match self.install(unit.id, None) {
                Ok(_) => installed += 1,
                Err(e) => warn!("Failed to install boot unit {}: {}", unit, e),
            }
        }
        info!("Installed {} boot unit(s)", installed);
    }

    /// Persist the graph and close every content provider.
    pub fn shutdown(&self) {
        self.persist();
        for content in self.registry.all_contents() {
            if let Err(e) = content.close() {
                debug!("Failed to close {}: {}", content.origin(), e);
            }
        }
        info!("Runtime shut down");
    }
}
