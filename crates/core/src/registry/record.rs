//! Persisted layer-graph record.
//!
//! Only structure is stored. Content units are rediscovered on restart
//! because the artifacts behind them may have changed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_api::{LayerId, LoaderType};

use super::Registry;
use crate::error::Result;

pub const RECORD_FILE: &str = "layers.json";
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: LayerId,
    pub name: String,
    pub loader: LoaderType,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub parents: Vec<LayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub version: u32,
    pub next_id: u64,
    pub layers: Vec<LayerRecord>,
}

impl GraphRecord {
    pub fn path_in(storage: &Path) -> PathBuf {
        storage.join(RECORD_FILE)
    }

    /// Load the record from `storage`.
    ///
    /// A missing file yields `None`. So does an unreadable or outdated one,
    /// after a warning, so that startup proceeds with a fresh graph.
    pub fn load(storage: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(storage);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;

        match serde_json::from_slice::<GraphRecord>(&bytes) {
            Ok(record) if record.version == RECORD_VERSION => {
                tracing::info!(
                    "Loaded layer graph record from {} ({} layers)",
                    path.display(),
                    record.layers.len()
                );
                Ok(Some(record))
            }
            Ok(record) => {
                tracing::warn!(
                    "Layer graph record version mismatch at {} (found {}, expected {}). Starting fresh.",
                    path.display(),
                    record.version,
                    RECORD_VERSION
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse layer graph record at {}: {}. Starting fresh.",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Write the record atomically (temp file, then rename).
    pub fn save(&self, storage: &Path) -> Result<()> {
        std::fs::create_dir_all(storage)?;
        let path = Self::path_in(storage);
        let bytes = serde_json::to_vec_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved layer graph record to {}", path.display());
        Ok(())
    }

    /// Non-boot layers in an order where parents precede children.
    pub fn restorable(&self) -> Vec<&LayerRecord> {
        let mut layers: Vec<&LayerRecord> =
            self.layers.iter().filter(|l| !l.id.is_boot()).collect();
        layers.sort_by_key(|l| l.id);
        layers
    }
}

impl Registry {
    /// Structural snapshot of the whole graph.
    pub fn snapshot(&self) -> GraphRecord {
        let graph = self.graph.read();
        GraphRecord {
            version: RECORD_VERSION,
            next_id: graph.next_layer,
            layers: graph
                .layers
                .values()
                .map(|l| LayerRecord {
                    id: l.id,
                    name: l.name.clone(),
                    loader: l.loader,
                    paths: l.paths.clone(),
                    parents: l.parents.clone(),
                })
                .collect(),
        }
    }
}
