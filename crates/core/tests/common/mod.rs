#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use strata_api::{BoxError, HostFramework, HostHandle, UnitDescriptor};
use strata_core::discovery::FRAMEWORK_FACTORY_MARKER;
use strata_core::manifest::MANIFEST_PATH;
use strata_core::{Deployment, Runtime};
use zip::write::SimpleFileOptions;

pub fn write_unit(path: &Path, name: &str, version: &str, extra: &[&str]) {
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

pub fn write_factory(path: &Path) {
    write_unit(path, "host.framework", "7.0.0", &[FRAMEWORK_FACTORY_MARKER]);
}

/// Fill `dir` with `count` units named `<prefix>.<n>`.
pub fn populate(dir: &Path, prefix: &str, count: usize) {
    std::fs::create_dir_all(dir).unwrap();
    for n in 0..count {
        let name = format!("{}.{}", prefix, n);
        write_unit(
            &dir.join(format!("{}.jar", name)),
            &name,
            "1.0.0",
            &[&format!("{}/Main.class", prefix.replace('.', "/"))],
        );
    }
}

/// Host framework fake that records installs and teardowns.
#[derive(Default)]
pub struct FakeHost {
    installed: Mutex<HashMap<String, HostHandle>>,
    next_id: Mutex<u64>,
    pub install_calls: Mutex<usize>,
    pub uninstalled: Mutex<Vec<HostHandle>>,
    pub fail_uninstall: Mutex<bool>,
}

impl FakeHost {
    pub fn installed_locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.installed.lock().keys().cloned().collect();
        locations.sort();
        locations
    }
}

impl HostFramework for FakeHost {
    fn install(&self, descriptor: &UnitDescriptor) -> Result<HostHandle, BoxError> {
        *self.install_calls.lock() += 1;
        let mut installed = self.installed.lock();
        let handle = installed
            .entry(descriptor.location.clone())
            .or_insert_with(|| {
                let mut next = self.next_id.lock();
                *next += 1;
                HostHandle::new(*next, descriptor.location.clone())
            });
        Ok(handle.clone())
    }

    fn uninstall(&self, handle: &HostHandle) -> Result<(), BoxError> {
        self.uninstalled.lock().push(handle.clone());
        if *self.fail_uninstall.lock() {
            return Err(format!("cannot uninstall {}", handle.location).into());
        }
        self.installed.lock().remove(&handle.location);
        Ok(())
    }
}

pub fn directory_runtime(boot: &Path) -> (Arc<Runtime>, Arc<FakeHost>) {
    let host = Arc::new(FakeHost::default());
    let runtime = Runtime::new(Deployment::directory(boot), host.clone()).unwrap();
    (Arc::new(runtime), host)
}
