#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use reloadwatch::fs::mock::MockFileSystem;
use reloadwatch::store::MemoryResourceStore;
use tempfile::TempDir;

pub use reloadwatch_test_utils::{
    init_tracing, module_source, remove_module, with_timeout, write_module, FakeCompiler,
    RecordingListener, RecordingSink, FAST_INTERVAL, WAIT,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A temp directory plus its canonical path (monitors report canonical roots).
pub fn temp_root() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    Ok((dir, root))
}

/// Mock tree with files below `root/`.
pub fn mock_tree(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("root");
    for (path, content) in files {
        fs.add_file(format!("root/{path}"), content.as_bytes());
    }
    fs
}

/// In-memory store holding the given modules (`name`, imports, body).
pub fn memory_store(modules: &[(&str, &[&str])]) -> Arc<MemoryResourceStore> {
    let store = Arc::new(MemoryResourceStore::new());
    for (name, imports) in modules {
        put_module(&store, name, imports, name);
    }
    store
}

pub fn put_module(store: &MemoryResourceStore, name: &str, imports: &[&str], body: &str) {
    use reloadwatch::store::ResourceStore;
    store
        .write(
            &reloadwatch::loader::naming::resource_name(name),
            module_source(imports, body).as_bytes(),
        )
        .expect("memory store write");
}
