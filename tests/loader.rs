// tests/loader.rs
mod common;
use crate::common::{init_tracing, memory_store, put_module, TestResult};

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use reloadwatch::errors::LoadError;
use reloadwatch::loader::naming::resource_name;
use reloadwatch::loader::{DependencyGraph, ModuleLoader, NoLinks};
use reloadwatch::monitor::ChangeSet;
use reloadwatch::store::{MemoryResourceStore, ResourceStore};
use reloadwatch::types::ReloadEvent;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn event(epoch: u64, created: &[&str], modified: &[&str], deleted: &[&str]) -> ReloadEvent {
    event_on("root", epoch, created, modified, deleted)
}

fn event_on(root: &str, epoch: u64, created: &[&str], modified: &[&str], deleted: &[&str]) -> ReloadEvent {
    let res = |names: &[&str]| -> BTreeSet<String> { names.iter().map(|n| resource_name(n)).collect() };
    ReloadEvent::new(
        root,
        epoch,
        ChangeSet {
            created: res(created),
            modified: res(modified),
            deleted: res(deleted),
        },
    )
}

fn loader_over(store: &Arc<MemoryResourceStore>) -> ModuleLoader {
    ModuleLoader::new(store.clone())
}

#[test]
fn load_caches_and_returns_same_record() -> TestResult {
    init_tracing();
    let store = memory_store(&[("app.A", &[])]);
    let loader = loader_over(&store);

    let first = loader.load("app.A")?;
    let second = loader.load("app.A")?;

    assert!(Arc::ptr_eq(&first, &second));
    assert!(loader.is_cached("app.A"));
    assert_eq!(first.resolved_at, 0);
    Ok(())
}

#[test]
fn unknown_module_is_resource_not_found() {
    let loader = loader_over(&memory_store(&[]));

    let err = loader.load("nope.X").unwrap_err();

    assert_eq!(err, LoadError::ResourceNotFound("nope.X".into()));
    assert_eq!(err.missing_name(), Some("nope.X"));
}

#[test]
fn dependencies_are_recorded_from_imports() -> TestResult {
    let store = memory_store(&[("A", &[]), ("B", &["A"]), ("C", &["B", "A"])]);
    let loader = loader_over(&store);

    let c = loader.load("C")?;

    assert_eq!(c.dependencies, set(&["A", "B"]));
    assert_eq!(loader.cached_names(), set(&["A", "B", "C"]));
    Ok(())
}

#[test]
fn modified_module_is_reloaded_with_new_bytes() -> TestResult {
    let store = memory_store(&[("A", &[])]);
    let loader = loader_over(&store);
    let before = loader.load("A")?;

    put_module(&store, "A", &[], "version two");
    loader.apply(&event(1, &[], &["A"], &[]));
    let after = loader.load("A")?;

    assert!(!Arc::ptr_eq(&before, &after));
    assert!(String::from_utf8_lossy(&after.bytes).contains("version two"));
    assert_eq!(after.resolved_at, 1);
    Ok(())
}

#[test]
fn modification_cascades_to_transitive_dependents_only() -> TestResult {
    // C -> B -> A, D independent.
    let store = memory_store(&[("A", &[]), ("B", &["A"]), ("C", &["B"]), ("D", &[])]);
    let loader = loader_over(&store);
    loader.load("C")?;
    let d = loader.load("D")?;

    loader.apply(&event(1, &[], &["A"], &[]));

    assert_eq!(loader.cached_names(), set(&["D"]));
    assert!(Arc::ptr_eq(&d, &loader.load("D")?));

    let c = loader.load("C")?;
    assert_eq!(c.resolved_at, 1);
    assert_eq!(loader.cached_names(), set(&["A", "B", "C", "D"]));
    Ok(())
}

#[test]
fn modifying_a_leaf_dependent_keeps_its_dependencies() -> TestResult {
    let store = memory_store(&[("A", &[]), ("B", &["A"])]);
    let loader = loader_over(&store);
    let a = loader.load("A")?;
    loader.load("B")?;

    loader.apply(&event(1, &[], &["B"], &[]));

    assert_eq!(loader.cached_names(), set(&["A"]));
    assert!(Arc::ptr_eq(&a, &loader.load("A")?));
    Ok(())
}

#[test]
fn deleted_module_is_not_found_even_if_store_still_has_it() -> TestResult {
    let store = memory_store(&[("A", &[])]);
    let loader = loader_over(&store);
    loader.load("A")?;

    // The event wins over whatever the store still holds.
    loader.apply(&event(1, &[], &[], &["A"]));

    assert_eq!(
        loader.load("A").unwrap_err(),
        LoadError::ResourceNotFound("A".into())
    );
    Ok(())
}

#[test]
fn dependent_of_deleted_module_reports_missing_dependency() -> TestResult {
    let store = memory_store(&[("A", &[]), ("B", &["A"])]);
    let loader = loader_over(&store);
    loader.load("B")?;

    store.remove(&resource_name("A"))?;
    loader.apply(&event(1, &[], &[], &["A"]));

    let err = loader.load("B").unwrap_err();
    assert_eq!(
        err,
        LoadError::MissingDependency {
            name: "B".into(),
            missing: "A".into()
        }
    );
    assert_eq!(err.missing_name(), Some("A"));
    Ok(())
}

#[test]
fn missing_dependency_names_the_innermost_module() {
    // C -> B -> A, A absent.
    let store = memory_store(&[("B", &["A"]), ("C", &["B"])]);
    let loader = loader_over(&store);

    let err = loader.load("C").unwrap_err();

    assert_eq!(
        err,
        LoadError::MissingDependency {
            name: "C".into(),
            missing: "A".into()
        }
    );
    assert!(!loader.is_cached("B"));
    assert!(!loader.is_cached("C"));
}

#[test]
fn recreated_module_loads_again() -> TestResult {
    let store = memory_store(&[("A", &[])]);
    let loader = loader_over(&store);
    loader.load("A")?;

    store.remove(&resource_name("A"))?;
    loader.apply(&event(1, &[], &[], &["A"]));
    assert!(loader.load("A").is_err());

    put_module(&store, "A", &[], "back again");
    loader.apply(&event(2, &["A"], &[], &[]));

    let a = loader.load("A")?;
    assert!(String::from_utf8_lossy(&a.bytes).contains("back again"));
    Ok(())
}

#[test]
fn stale_and_duplicate_events_are_ignored() -> TestResult {
    let store = memory_store(&[("A", &[])]);
    let loader = loader_over(&store);

    loader.apply(&event(5, &[], &[], &[]));
    let a = loader.load("A")?;

    loader.apply(&event(5, &[], &["A"], &[]));
    loader.apply(&event(3, &[], &[], &["A"]));

    assert_eq!(loader.last_epoch(Path::new("root")), 5);
    assert_eq!(loader.applied_events(), 1);
    assert!(Arc::ptr_eq(&a, &loader.load("A")?));
    Ok(())
}

#[test]
fn epochs_are_ordered_per_root() -> TestResult {
    let store = memory_store(&[("A", &[]), ("B", &[])]);
    let loader = loader_over(&store);

    loader.apply(&event_on("left", 1, &[], &[], &[]));
    loader.apply(&event_on("left", 2, &[], &[], &[]));
    let a = loader.load("A")?;

    // A second root starts its own sequence at 1 and is not stale.
    loader.apply(&event_on("right", 1, &[], &["A"], &[]));
    assert!(!loader.is_cached("A"));
    assert!(!Arc::ptr_eq(&a, &loader.load("A")?));

    let b = loader.load("B")?;
    loader.apply(&event_on("left", 2, &[], &["B"], &[]));
    assert!(Arc::ptr_eq(&b, &loader.load("B")?));

    assert_eq!(loader.last_epoch(Path::new("left")), 2);
    assert_eq!(loader.last_epoch(Path::new("right")), 1);
    assert_eq!(loader.applied_events(), 3);
    Ok(())
}

#[test]
fn mutual_references_load_and_invalidate_together() -> TestResult {
    let store = memory_store(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
    let loader = loader_over(&store);

    let a = loader.load("A")?;
    assert_eq!(a.dependencies, set(&["B"]));
    assert_eq!(loader.load("B")?.dependencies, set(&["A"]));
    loader.load("C")?;

    loader.apply(&event(1, &[], &["A"], &[]));

    assert_eq!(loader.cached_names(), set(&["C"]));
    Ok(())
}

#[test]
fn self_import_is_not_a_dependency() -> TestResult {
    let store = memory_store(&[("A", &["A"])]);
    let loader = loader_over(&store);

    assert!(loader.load("A")?.dependencies.is_empty());
    Ok(())
}

#[test]
fn parent_supplies_modules_the_child_lacks() -> TestResult {
    let parent_store = memory_store(&[("lib.Base", &[])]);
    let parent: Arc<ModuleLoader> = Arc::new(loader_over(&parent_store));
    let child_store = memory_store(&[("app.Main", &["lib.Base"])]);
    let child = ModuleLoader::new(child_store.clone()).with_parent(parent.clone());

    let main = child.load("app.Main")?;
    let base = child.load("lib.Base")?;

    assert_eq!(main.dependencies, set(&["lib.Base"]));
    assert!(Arc::ptr_eq(&base, &parent.load("lib.Base")?));
    assert!(!child.is_cached("lib.Base"));
    Ok(())
}

#[test]
fn child_definition_shadows_parent_once_created() -> TestResult {
    let parent_store = memory_store(&[("lib.Base", &[])]);
    let parent = Arc::new(loader_over(&parent_store));
    let child_store = memory_store(&[("app.Main", &["lib.Base"])]);
    let child = ModuleLoader::new(child_store.clone()).with_parent(parent);

    child.load("app.Main")?;

    put_module(&child_store, "lib.Base", &[], "local override");
    child.apply(&event(1, &["lib.Base"], &[], &[]));

    // app.Main depended on the parent's lib.Base and was evicted with it.
    assert!(!child.is_cached("app.Main"));
    let base = child.load("lib.Base")?;
    assert!(String::from_utf8_lossy(&base.bytes).contains("local override"));
    assert!(child.is_cached("lib.Base"));
    Ok(())
}

#[test]
fn store_failure_is_reported_and_not_cached() {
    use anyhow::anyhow;

    struct Broken;
    impl ResourceStore for Broken {
        fn write(&self, _name: &str, _bytes: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("read-only"))
        }
        fn read(&self, _name: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Err(anyhow!("disk on fire"))
        }
        fn remove(&self, _name: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    let loader = ModuleLoader::new(Arc::new(Broken));

    match loader.load("A") {
        Err(LoadError::Store { name, reason }) => {
            assert_eq!(name, "A");
            assert!(reason.contains("disk on fire"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
    assert!(!loader.is_cached("A"));
}

#[test]
fn no_links_linker_ignores_imports() -> TestResult {
    let store = memory_store(&[("B", &["A"])]);
    let loader = ModuleLoader::new(store.clone()).with_linker(Arc::new(NoLinks));

    assert!(loader.load("B")?.dependencies.is_empty());
    Ok(())
}

#[test]
fn concurrent_loads_agree_on_a_single_record() -> TestResult {
    let store = memory_store(&[("A", &[]), ("B", &["A"])]);
    let loader = Arc::new(loader_over(&store));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            std::thread::spawn(move || loader.load("B").map(|m| m.dependencies.clone()))
        })
        .collect();

    for handle in handles {
        let deps = handle.join().map_err(|_| "load thread panicked")??;
        assert_eq!(deps, set(&["A"]));
    }
    assert_eq!(loader.cached_names(), set(&["A", "B"]));
    Ok(())
}

#[test]
fn dependency_graph_closure_handles_cycles() {
    let mut graph = DependencyGraph::new();
    let a = "A".to_string();
    let b = "B".to_string();
    graph.set_dependencies("B", [&a]);
    graph.set_dependencies("A", [&b]);
    graph.set_dependencies("C", [&b]);

    assert_eq!(graph.closure(["A"]), set(&["A", "B", "C"]));
    assert_eq!(graph.dependents_of("B"), set(&["A", "C"]));
    assert_eq!(graph.closure(["Z"]), set(&["Z"]));
}

/// Store whose first read of `A.res` parks between two barriers.
struct ParkingStore {
    inner: MemoryResourceStore,
    armed: AtomicBool,
    reading: Barrier,
    release: Barrier,
}

impl ResourceStore for ParkingStore {
    fn write(&self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.inner.write(name, bytes)
    }

    fn read(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let bytes = self.inner.read(name)?;
        if name == "A.res" && self.armed.swap(false, Ordering::SeqCst) {
            self.reading.wait();
            self.release.wait();
        }
        Ok(bytes)
    }

    fn remove(&self, name: &str) -> anyhow::Result<bool> {
        self.inner.remove(name)
    }
}

#[test]
fn load_overlapping_an_invalidation_is_returned_but_not_cached() -> TestResult {
    let store = Arc::new(ParkingStore {
        inner: MemoryResourceStore::new(),
        armed: AtomicBool::new(true),
        reading: Barrier::new(2),
        release: Barrier::new(2),
    });
    put_module(&store.inner, "A", &[], "old");
    let loader = Arc::new(ModuleLoader::new(store.clone()));

    let loading = {
        let loader = loader.clone();
        std::thread::spawn(move || loader.load("A"))
    };

    // The load holds the old bytes and is parked inside the store.
    store.reading.wait();
    put_module(&store.inner, "A", &[], "new");
    loader.apply(&event(1, &[], &["A"], &[]));
    store.release.wait();

    let overlapped = loading.join().map_err(|_| "load thread panicked")??;
    assert!(String::from_utf8_lossy(&overlapped.bytes).contains("old"));
    assert!(!loader.is_cached("A"));

    let fresh = loader.load("A")?;
    assert!(String::from_utf8_lossy(&fresh.bytes).contains("new"));
    assert!(loader.is_cached("A"));
    assert!(!Arc::ptr_eq(&overlapped, &fresh));
    Ok(())
}
