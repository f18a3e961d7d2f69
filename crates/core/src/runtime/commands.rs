//! Console commands over the runtime.

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use strata_api::{LayerId, LayerInfo, LoaderType};

use super::Runtime;
use crate::error::{Result, StrataError};

/// Service name [`LayerCommands`] is registered under.
pub const COMMANDS_SERVICE: &str = "strata.commands";

pub struct LayerCommands {
    runtime: Arc<Runtime>,
}

impl LayerCommands {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    /// Render every layer and its units.
    pub fn list(&self) -> String {
        let registry = self.runtime.registry();
        let mut out = String::new();
        for layer in registry.layers() {
            let _ = writeln!(out, "{}", header(&layer));
            for path in &layer.paths {
                let _ = writeln!(out, "  path: {}", path.display());
            }
            for unit in registry.layer_units(layer.id) {
                let _ = write!(out, "  {} {} {:?}", unit.id, unit, unit.state);
                if let Some(location) = &unit.location {
                    let _ = write!(out, " @ {}", location);
                }
                out.push('\n');
            }
        }
        out
    }

    /// Add a layer under the boot layer, optionally installing its units.
    pub fn add_layer(
        &self,
        name: &str,
        loader: &str,
        paths: &[PathBuf],
        install: bool,
    ) -> Result<LayerInfo> {
        let loader = LoaderType::parse(loader).ok_or_else(|| {
            StrataError::unsupported(format!("unknown loader type '{}'", loader))
        })?;
        let id = self
            .runtime
            .add_layer(&[LayerId::BOOT], name, loader, paths)?;
        if install {
            self.runtime.install_layer(id, None)?;
        }
        self.runtime
            .registry()
            .layer(id)
            .ok_or_else(|| StrataError::illegal_state(format!("layer {} vanished", id)))
    }

    pub fn uninstall(&self, id: u64) -> Result<Vec<LayerId>> {
        self.runtime.uninstall_layer(LayerId(id))
    }
}

fn header(layer: &LayerInfo) -> String {
    let mut line = format!("Layer {} '{}' ({})", layer.id, layer.name, layer.loader);
    if !layer.parents.is_empty() {
        let parents: Vec<String> = layer.parents.iter().map(|p| p.to_string()).collect();
        let _ = write!(line, " parents [{}]", parents.join(", "));
    }
    line
}
