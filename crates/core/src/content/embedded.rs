//! Content described by an embedded index.
//!
//! Only names on the unit's entry list exist. Their bytes live in a baked-in
//! resource namespace under `<index-id>/<entry>`, falling back to the
//! unnamespaced `<entry>`.

use std::io::{self, Cursor};
use std::sync::Arc;
use strata_api::{ContentEntry, ContentProvider, EntryStream, Headers, ResourceStore};

use crate::manifest;

#[derive(Clone)]
pub struct EmbeddedContent {
    index_id: String,
    entries: Arc<[String]>,
    store: Arc<dyn ResourceStore>,
}

impl EmbeddedContent {
    pub fn new(
        index_id: impl Into<String>,
        entries: Vec<String>,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            index_id: index_id.into(),
            entries: entries.into(),
            store,
        }
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    /// Resource key holding `name`, namespaced first
    fn resource_key(&self, name: &str) -> Option<String> {
        let namespaced = format!("{}/{}", self.index_id, name);
        if self.store.resource(&namespaced).is_some() {
            return Some(namespaced);
        }
        self.store.resource(name).map(|_| name.to_string())
    }
}

impl ContentProvider for EmbeddedContent {
    fn open(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(self.entries.iter().cloned())
    }

    fn entry(&self, name: &str) -> Option<Box<dyn ContentEntry>> {
        if !self.entries.iter().any(|e| e == name) {
            return None;
        }
        let key = self.resource_key(name);
        // Listed names without bytes are directory entries
        let size = key
            .as_deref()
            .and_then(|key| self.store.resource(key))
            .map(|b| b.len() as u64)
            .unwrap_or(0);
        Some(Box::new(EmbeddedEntry {
            name: name.to_string(),
            key,
            size,
            store: self.store.clone(),
        }))
    }

    fn headers(&self) -> Option<Headers> {
        manifest::read(self)
    }

    fn origin(&self) -> String {
        format!("embedded:{}", self.index_id)
    }
}

struct EmbeddedEntry {
    name: String,
    key: Option<String>,
    size: u64,
    store: Arc<dyn ResourceStore>,
}

impl ContentEntry for EmbeddedEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> u64 {
        0
    }

    fn open_stream(&self) -> io::Result<EntryStream> {
        let bytes = match &self.key {
            Some(key) => self
                .store
                .resource(key)
                .map(|b| b.into_owned())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, key.clone()))?,
            None => Vec::new(),
        };
        Ok(Box::new(Cursor::new(bytes)))
    }
}
