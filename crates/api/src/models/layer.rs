use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::unit::UnitId;

/// Stable layer identifier. Allocated monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl LayerId {
    /// The boot layer always has id 0 and no parents.
    pub const BOOT: LayerId = LayerId(0);

    pub fn is_boot(&self) -> bool {
        *self == Self::BOOT
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How units inside a layer resolve symbols and resources.
///
/// Fixed when the layer is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoaderType {
    /// One common scope for every unit of the layer. Collisions shadow.
    Shared,
    /// One isolated scope per unit.
    PerUnit,
    /// Scopes are owned by the live host module system.
    HostDelegated,
}

impl LoaderType {
    pub const ALL: [LoaderType; 3] = [
        LoaderType::Shared,
        LoaderType::PerUnit,
        LoaderType::HostDelegated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderType::Shared => "SHARED",
            LoaderType::PerUnit => "PER_UNIT",
            LoaderType::HostDelegated => "HOST_DELEGATED",
        }
    }

    /// Case-insensitive parse, accepting `-` in place of `_`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SHARED" => Some(LoaderType::Shared),
            "PER_UNIT" => Some(LoaderType::PerUnit),
            "HOST_DELEGATED" => Some(LoaderType::HostDelegated),
            _ => None,
        }
    }
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a layer, detached from the registry lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub loader: LoaderType,
    /// Parents in search order.
    pub parents: Vec<LayerId>,
    pub children: Vec<LayerId>,
    pub units: Vec<UnitId>,
    /// Paths the layer was discovered from, kept for rediscovery after restart.
    pub paths: Vec<PathBuf>,
}
