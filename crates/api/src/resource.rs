//! Baked-in resource namespace used by embedded-index deployments.

use std::borrow::Cow;
use std::collections::HashMap;

/// Read-only resource lookup by `/` separated path.
pub trait ResourceStore: Send + Sync {
    fn resource(&self, path: &str) -> Option<Cow<'_, [u8]>>;
}

/// In-memory resource store, typically built from `include_bytes!` tables.
#[derive(Debug, Default, Clone)]
pub struct StaticResources {
    entries: HashMap<String, Cow<'static, [u8]>>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_static(table: &'static [(&'static str, &'static [u8])]) -> Self {
        Self {
            entries: table
                .iter()
                .map(|(path, bytes)| (path.to_string(), Cow::Borrowed(*bytes)))
                .collect(),
        }
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), Cow::Owned(bytes.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceStore for StaticResources {
    fn resource(&self, path: &str) -> Option<Cow<'_, [u8]>> {
        self.entries.get(path).map(|b| Cow::Borrowed(b.as_ref()))
    }
}
