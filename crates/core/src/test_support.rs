//! Fixtures shared by unit tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use strata_api::{BoxError, HostFramework, HostHandle, UnitDescriptor};
use zip::write::SimpleFileOptions;

use crate::manifest::MANIFEST_PATH;

/// Write a zip archive carrying a manifest identity plus `extra` entries.
pub(crate) fn write_unit(path: &Path, name: &str, version: &str, extra: &[&str]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    zip.start_file(MANIFEST_PATH, options).unwrap();
    write!(
        zip,
        "Manifest-Version: 1.0\nBundle-SymbolicName: {}\nBundle-Version: {}\n",
        name, version
    )
    .unwrap();
    for entry in extra {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(entry.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Host framework that records calls and hands out sequential handles.
#[derive(Default)]
pub(crate) struct RecordingHost {
    installed: Mutex<HashMap<String, HostHandle>>,
    next_id: Mutex<u64>,
    pub(crate) uninstalled: Mutex<Vec<HostHandle>>,
    pub(crate) install_calls: Mutex<usize>,
    pub(crate) reject: Mutex<Option<String>>,
}

impl RecordingHost {
    pub(crate) fn installed_count(&self) -> usize {
        self.installed.lock().len()
    }
}

impl HostFramework for RecordingHost {
    fn install(&self, descriptor: &UnitDescriptor) -> Result<HostHandle, BoxError> {
        *self.install_calls.lock() += 1;
        if self.reject.lock().as_deref() == Some(descriptor.location.as_str()) {
            return Err(format!("rejected {}", descriptor.location).into());
        }
        let mut installed = self.installed.lock();
        Ok(installed
            .entry(descriptor.location.clone())
            .or_insert_with(|| {
                let mut next = self.next_id.lock();
                *next += 1;
                HostHandle::new(*next, descriptor.location.clone())
            })
            .clone())
    }

    fn uninstall(&self, handle: &HostHandle) -> Result<(), BoxError> {
        self.installed.lock().remove(&handle.location);
        self.uninstalled.lock().push(handle.clone());
        Ok(())
    }
}
