mod common;

use common::{FakeHost, directory_runtime, populate, write_factory, write_unit};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::{Arc, Barrier, Weak};
use strata_api::{
    BoxError, HostFramework, HostHandle, LayerId, LoaderType, StaticResources, UnitDescriptor,
    UnitId, UnitState,
};
use strata_core::runtime::UNINSTALL_ATTEMPTS;
use strata_core::{Deployment, Runtime, SYSTEM_LOCATION, StrataError};
use tempfile::tempdir;

#[test]
fn test_install_is_idempotent() {
    let dir = tempdir().unwrap();
    write_unit(&dir.path().join("x.jar"), "x", "1.0", &[]);
    let (runtime, host) = directory_runtime(dir.path());

    let x = runtime.registry().layer_units(LayerId::BOOT)[0].id;
    let first = runtime.install(x, Some("test")).unwrap();
    assert_eq!(first.location, "test:x");

    let second = runtime.install(x, Some("test")).unwrap();
    assert_eq!(first, second);
    assert_eq!(*host.install_calls.lock(), 1);

    let info = runtime.registry().unit(x).unwrap();
    assert_eq!(info.state, UnitState::Installed);
    assert_eq!(info.location.as_deref(), Some("test:x"));
}

#[test]
fn test_connect_is_idempotent_and_exclusive() {
    let dir = tempdir().unwrap();
    write_unit(&dir.path().join("a.jar"), "a", "1.0", &[]);
    write_unit(&dir.path().join("b.jar"), "b", "1.0", &[]);
    let (runtime, _host) = directory_runtime(dir.path());
    let units = runtime.registry().layer_units(LayerId::BOOT);
    let (a, b) = (units[0].id, units[1].id);

    runtime.connect(a, "loc:a").unwrap();
    runtime.connect(a, "loc:a").unwrap();
    assert!(matches!(
        runtime.connect(b, "loc:a"),
        Err(StrataError::IllegalState(_))
    ));
    assert!(matches!(
        runtime.connect(a, "loc:other"),
        Err(StrataError::IllegalState(_))
    ));
    assert_eq!(runtime.registry().find_by_location("loc:a").unwrap().id, a);

    // Installing a connected unit keeps its location
    let handle = runtime.install(a, None).unwrap();
    assert_eq!(handle.location, "loc:a");
}

#[test]
fn test_disconnect_tears_down_handle() {
    let dir = tempdir().unwrap();
    write_unit(&dir.path().join("x.jar"), "x", "1.0", &[]);
    let (runtime, host) = directory_runtime(dir.path());
    let x = runtime.registry().layer_units(LayerId::BOOT)[0].id;

    let handle = runtime.install(x, None).unwrap();
    assert_eq!(handle.location, "strata:x");
    runtime.disconnect(x).unwrap();

    assert_eq!(host.uninstalled.lock().as_slice(), &[handle]);
    let info = runtime.registry().unit(x).unwrap();
    assert_eq!(info.state, UnitState::Unconnected);
    assert!(runtime.registry().find_by_location("strata:x").is_none());

    // Disconnecting again is a no-op
    runtime.disconnect(x).unwrap();
    assert_eq!(host.uninstalled.lock().len(), 1);
}

#[test]
fn test_system_unit_is_protected() {
    let dir = tempdir().unwrap();
    write_factory(&dir.path().join("framework.jar"));
    write_unit(&dir.path().join("x.jar"), "x", "1.0", &[]);
    let (runtime, _host) = directory_runtime(dir.path());

    let system = runtime.registry().find_by_location(SYSTEM_LOCATION).unwrap();
    assert_eq!(system.name, "host.framework");
    assert!(matches!(
        runtime.disconnect(system.id),
        Err(StrataError::Unsupported(_))
    ));
    assert!(matches!(
        runtime.install(system.id, None),
        Err(StrataError::Unsupported(_))
    ));

    // Layer installs skip the system unit
    let handles = runtime.install_layer(LayerId::BOOT, None).unwrap();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].location, "strata:x");
}

#[test]
fn test_child_layers_grow_and_shrink_content() {
    let boot = tempdir().unwrap();
    write_unit(&boot.path().join("core.jar"), "core", "1.0", &[]);
    let source = tempdir().unwrap();
    populate(source.path(), "ext", 3);
    let (runtime, _host) = directory_runtime(boot.path());

    let before = runtime.registry().content_count();
    let layers: Vec<LayerId> = (0..20)
        .map(|n| {
            runtime
                .add_layer(
                    &[LayerId::BOOT],
                    &format!("layer-{}", n),
                    LoaderType::PerUnit,
                    &[source.path().to_path_buf()],
                )
                .unwrap()
        })
        .collect();
    assert_eq!(runtime.registry().content_count(), before + 60);

    for id in layers {
        assert_eq!(runtime.uninstall_layer(id).unwrap(), vec![id]);
    }
    assert_eq!(runtime.registry().content_count(), before);
    assert!(runtime.registry().layer(LayerId::BOOT).unwrap().children.is_empty());
}

#[test]
fn test_uninstall_cascades_to_descendants() {
    let boot = tempdir().unwrap();
    let a_dir = tempdir().unwrap();
    let b_dir = tempdir().unwrap();
    populate(a_dir.path(), "a", 1);
    populate(b_dir.path(), "b", 2);
    let (runtime, host) = directory_runtime(boot.path());

    let a = runtime
        .add_layer(&[LayerId::BOOT], "a", LoaderType::Shared, &[a_dir.path().to_path_buf()])
        .unwrap();
    let b = runtime
        .add_layer(&[a], "b", LoaderType::PerUnit, &[b_dir.path().to_path_buf()])
        .unwrap();
    let c = runtime
        .add_layer(&[b, a], "c", LoaderType::PerUnit, &[])
        .unwrap();

    runtime.install_layer(a, None).unwrap();
    runtime.install_layer(b, Some("deep")).unwrap();
    assert_eq!(host.installed_locations().len(), 3);

    let removed = runtime.uninstall_layer(a).unwrap();
    assert_eq!(removed, vec![c, b, a]);

    // Descendant units are torn down before the parent's
    let order: Vec<String> = host
        .uninstalled
        .lock()
        .iter()
        .map(|h| h.location.clone())
        .collect();
    assert_eq!(order, vec!["deep:b.0", "deep:b.1", "strata:a.0"]);
    assert!(host.installed_locations().is_empty());

    for id in [a, b, c] {
        assert!(runtime.registry().layer(id).is_none());
    }
    for layer in runtime.registry().layers() {
        assert!(!layer.parents.contains(&a));
        assert!(!layer.children.contains(&a));
    }
    assert!(matches!(
        runtime.uninstall_layer(a),
        Err(StrataError::IllegalState(_))
    ));
}

#[test]
fn test_failed_teardown_does_not_block_uninstall() {
    let boot = tempdir().unwrap();
    let ext = tempdir().unwrap();
    populate(ext.path(), "ext", 2);
    let (runtime, host) = directory_runtime(boot.path());

    let layer = runtime
        .add_layer(&[LayerId::BOOT], "ext", LoaderType::PerUnit, &[ext.path().to_path_buf()])
        .unwrap();
    runtime.install_layer(layer, None).unwrap();
    *host.fail_uninstall.lock() = true;

    runtime.uninstall_layer(layer).unwrap();
    assert_eq!(host.uninstalled.lock().len(), 2);
    assert!(runtime.registry().layer(layer).is_none());
}

#[test]
fn test_find_content_prefers_nearest_layer() {
    let boot = tempdir().unwrap();
    write_unit(&boot.path().join("util.jar"), "util", "1.0", &[]);
    let left = tempdir().unwrap();
    write_unit(&left.path().join("util.jar"), "util", "2.0", &[]);
    let right = tempdir().unwrap();
    write_unit(&right.path().join("util.jar"), "util", "3.0", &[]);
    let (runtime, _host) = directory_runtime(boot.path());

    let l = runtime
        .add_layer(&[LayerId::BOOT], "left", LoaderType::PerUnit, &[left.path().to_path_buf()])
        .unwrap();
    let r = runtime
        .add_layer(&[LayerId::BOOT], "right", LoaderType::PerUnit, &[right.path().to_path_buf()])
        .unwrap();
    let child = runtime
        .add_layer(&[r, l], "child", LoaderType::PerUnit, &[])
        .unwrap();

    let found = runtime.registry().find_content(child, "util").unwrap();
    assert_eq!(found.version, "3.0");
    let found = runtime.registry().find_content(l, "util").unwrap();
    assert_eq!(found.version, "2.0");
    assert!(runtime.registry().find_content(child, "missing").is_none());
}

#[test]
fn test_find_resource_follows_loader_type() {
    let boot = tempdir().unwrap();
    let shared = tempdir().unwrap();
    write_unit(&shared.path().join("a.jar"), "a", "1.0", &["a/Only.class"]);
    write_unit(&shared.path().join("b.jar"), "b", "1.0", &["b/Only.class"]);
    let (runtime, _host) = directory_runtime(boot.path());

    let shared_layer = runtime
        .add_layer(&[LayerId::BOOT], "shared", LoaderType::Shared, &[shared.path().to_path_buf()])
        .unwrap();
    let isolated_layer = runtime
        .add_layer(&[LayerId::BOOT], "isolated", LoaderType::PerUnit, &[shared.path().to_path_buf()])
        .unwrap();

    let a_shared = runtime.registry().layer_units(shared_layer)[0].id;
    let mut entry = runtime.find_resource(a_shared, "b/Only.class").unwrap();
    let mut text = String::new();
    entry.open_stream().unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "b/Only.class");

    let a_isolated = runtime.registry().layer_units(isolated_layer)[0].id;
    assert!(runtime.find_resource(a_isolated, "a/Only.class").is_some());
    assert!(runtime.find_resource(a_isolated, "b/Only.class").is_none());
    entry = runtime.find_resource(a_isolated, "a/Only.class").unwrap();
    assert_eq!(entry.name(), "a/Only.class");
}

#[test]
fn test_add_layer_validation() {
    let boot = tempdir().unwrap();
    let (runtime, _host) = directory_runtime(boot.path());

    assert!(matches!(
        runtime.add_layer(&[LayerId(42)], "orphan", LoaderType::PerUnit, &[]),
        Err(StrataError::IllegalState(_))
    ));
    assert!(matches!(
        runtime.add_layer(&[LayerId::BOOT], "delegated", LoaderType::HostDelegated, &[]),
        Err(StrataError::Unsupported(_))
    ));
    assert!(matches!(
        runtime.add_layer(
            &[LayerId::BOOT],
            "missing",
            LoaderType::PerUnit,
            &[boot.path().join("does-not-exist")]
        ),
        Err(StrataError::Io(_))
    ));
    assert_eq!(runtime.registry().layers().len(), 1);
    assert!(matches!(
        runtime.uninstall_layer(LayerId::BOOT),
        Err(StrataError::Unsupported(_))
    ));
}

#[test]
fn test_child_layers_skip_framework_factory() {
    let boot = tempdir().unwrap();
    let ext = tempdir().unwrap();
    write_factory(&ext.path().join("framework.jar"));
    write_unit(&ext.path().join("x.jar"), "x", "1.0", &[]);
    let (runtime, _host) = directory_runtime(boot.path());

    let layer = runtime
        .add_layer(&[LayerId::BOOT], "ext", LoaderType::PerUnit, &[ext.path().to_path_buf()])
        .unwrap();
    let names: Vec<String> = runtime
        .registry()
        .layer_units(layer)
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["x"]);
    assert!(runtime.registry().find_by_location(SYSTEM_LOCATION).is_none());
}

#[test]
fn test_fixed_deployments_cannot_add_layers() {
    let index = "ATOMOS_BUNDLE\nx\nx\n1.0\nx/Main.class\n";
    let store = StaticResources::new().with("atomos/bundles.index", index);
    let host = Arc::new(FakeHost::default());
    let runtime = Runtime::new(Deployment::embedded(Arc::new(store)), host).unwrap();

    assert_eq!(runtime.registry().content_count(), 1);
    assert!(matches!(
        runtime.add_layer(&[LayerId::BOOT], "more", LoaderType::Shared, &[]),
        Err(StrataError::Unsupported(_))
    ));
    assert_eq!(
        runtime.registry().layer(LayerId::BOOT).unwrap().loader,
        LoaderType::Shared
    );
}

#[test]
fn test_concurrent_installs_bind_location_once() {
    let boot = tempdir().unwrap();
    let source = tempdir().unwrap();
    populate(source.path(), "dup", 1);
    let (runtime, host) = directory_runtime(boot.path());

    let units: Vec<UnitId> = (0..8)
        .map(|n| {
            let layer = runtime
                .add_layer(
                    &[LayerId::BOOT],
                    &format!("sibling-{}", n),
                    LoaderType::PerUnit,
                    &[source.path().to_path_buf()],
                )
                .unwrap();
            runtime.registry().layer_units(layer)[0].id
        })
        .collect();

    let barrier = Barrier::new(units.len());
    let results: Vec<Result<HostHandle, StrataError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = units
            .iter()
            .map(|unit| {
                let runtime = &runtime;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    runtime.install(*unit, Some("p"))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StrataError::IllegalState(_)))
    );
    let bound = runtime
        .registry()
        .units()
        .into_iter()
        .filter(|u| u.location.as_deref() == Some("p:dup.0"))
        .count();
    assert_eq!(bound, 1);
    assert_eq!(host.installed_locations(), vec!["p:dup.0"]);
}

/// Host that reinstalls a unit every time it is asked to tear it down.
#[derive(Default)]
struct ReinstallingHost {
    runtime: Mutex<Option<Weak<Runtime>>>,
    sticky: Mutex<Option<UnitId>>,
    teardowns: Mutex<usize>,
}

impl HostFramework for ReinstallingHost {
    fn install(&self, descriptor: &UnitDescriptor) -> Result<HostHandle, BoxError> {
        Ok(HostHandle::new(1, descriptor.location.clone()))
    }

    fn uninstall(&self, _handle: &HostHandle) -> Result<(), BoxError> {
        *self.teardowns.lock() += 1;
        let runtime = self.runtime.lock().as_ref().and_then(Weak::upgrade);
        let sticky = *self.sticky.lock();
        if let (Some(runtime), Some(unit)) = (runtime, sticky) {
            runtime.install(unit, Some("again"))?;
        }
        Ok(())
    }
}

#[test]
fn test_uninstall_gives_up_when_units_keep_reconnecting() {
    let boot = tempdir().unwrap();
    let ext = tempdir().unwrap();
    populate(ext.path(), "ext", 1);
    let host = Arc::new(ReinstallingHost::default());
    let runtime = Arc::new(Runtime::new(Deployment::directory(boot.path()), host.clone()).unwrap());
    *host.runtime.lock() = Some(Arc::downgrade(&runtime));

    let layer = runtime
        .add_layer(&[LayerId::BOOT], "ext", LoaderType::PerUnit, &[ext.path().to_path_buf()])
        .unwrap();
    let unit = runtime.registry().layer_units(layer)[0].id;
    runtime.install(unit, None).unwrap();
    *host.sticky.lock() = Some(unit);

    assert!(matches!(
        runtime.uninstall_layer(layer),
        Err(StrataError::IllegalState(_))
    ));
    assert_eq!(*host.teardowns.lock(), UNINSTALL_ATTEMPTS);
    assert!(runtime.registry().layer(layer).is_some());
    assert_eq!(
        runtime.registry().unit(unit).unwrap().state,
        UnitState::Installed
    );

    // Once the host stops reinstalling, the next attempt succeeds
    *host.sticky.lock() = None;
    assert_eq!(runtime.uninstall_layer(layer).unwrap(), vec![layer]);
}
