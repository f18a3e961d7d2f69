use serde::{Deserialize, Serialize};
use std::fmt;

use super::layer::LayerId;

/// Arena index of a content unit inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connection state of a content unit.
///
/// A disconnected unit goes back to `Unconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    Unconnected,
    Connected,
    Installed,
}

/// Read-only snapshot of a content unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    pub id: UnitId,
    pub name: String,
    pub version: String,
    pub layer: LayerId,
    pub location: Option<String>,
    pub state: UnitState,
    /// Set once the host framework connected to the unit on its own.
    pub managed: bool,
}

impl UnitInfo {
    pub fn is_connected(&self) -> bool {
        self.location.is_some()
    }
}

impl fmt::Display for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
