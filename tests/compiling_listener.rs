// tests/compiling_listener.rs
mod common;
use crate::common::{init_tracing, mock_tree, with_timeout, FakeCompiler, RecordingSink, TestResult, FAST_INTERVAL, WAIT};

use std::sync::Arc;

use reloadwatch::errors::LoadError;
use reloadwatch::fs::mock::MockFileSystem;
use reloadwatch::listener::{AlterationListener, CompilingListener};
use reloadwatch::loader::ModuleLoader;
use reloadwatch::monitor::{AlterationMonitor, EpochCounter, MonitorConfig, RootObserver};
use reloadwatch::store::{DirectoryResourceStore, MemoryResourceStore, ResourceStore};

struct Rig {
    fs: MockFileSystem,
    artifacts: Arc<MemoryResourceStore>,
    compiling: Arc<CompilingListener<FakeCompiler>>,
    sink: Arc<RecordingSink>,
    loader: Arc<ModuleLoader>,
    observer: RootObserver,
    epochs: EpochCounter,
}

impl Rig {
    fn new(sources: &[(&str, &str)]) -> Self {
        let fs = mock_tree(sources);
        let reader = Arc::new(DirectoryResourceStore::with_filesystem("root", Arc::new(fs.clone())));
        let artifacts = Arc::new(MemoryResourceStore::new());
        let compiling = Arc::new(CompilingListener::new(
            FakeCompiler::new(),
            reader,
            artifacts.clone(),
        ));
        let loader = Arc::new(ModuleLoader::new(artifacts.clone()));
        let sink = RecordingSink::new();
        compiling.add_sink(loader.clone());
        compiling.add_sink(sink.clone());

        Self {
            fs,
            artifacts,
            compiling,
            sink,
            loader,
            observer: RootObserver::new("root"),
            epochs: EpochCounter::new(),
        }
    }

    fn tick(&mut self) {
        let listeners: Vec<Arc<dyn AlterationListener>> = vec![self.compiling.clone()];
        self.observer.check(&self.fs, &self.epochs, &listeners);
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn initial_sources_are_compiled_and_announced() -> TestResult {
    init_tracing();
    let mut rig = Rig::new(&[("app/Base.src", "base"), ("app/Main.src", "import app.Base\n\nmain")]);

    rig.tick();

    assert_eq!(rig.artifacts.names(), vec!["app/Base.res", "app/Main.res"]);
    let events = rig.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].epoch, 1);
    assert_eq!(events[0].changes.created.len(), 2);

    let main = rig.loader.load("app.Main")?;
    assert!(main.dependencies.contains("app.Base"));
    assert!(rig.compiling.last_result().is_some_and(|r| r.is_success()));
    Ok(())
}

#[test]
fn modified_source_rewrites_artifact_and_reloads_dependents() -> TestResult {
    let mut rig = Rig::new(&[("app/Base.src", "base"), ("app/Main.src", "import app.Base\n\nmain")]);
    rig.tick();
    rig.loader.load("app.Main")?;

    rig.fs.add_file("root/app/Base.src", "base v2");
    rig.tick();

    let events = rig.sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1].changes.modified.iter().collect::<Vec<_>>(),
        vec!["app/Base.res"]
    );
    assert!(events[1].changes.created.is_empty());
    // app.Main depends on app.Base and went with it.
    assert!(!rig.loader.is_cached("app.Main"));
    assert_eq!(text(&rig.loader.load("app.Base")?.bytes), "base v2");
    Ok(())
}

#[test]
fn compile_errors_keep_old_artifact_and_emit_nothing() -> TestResult {
    let mut rig = Rig::new(&[("app/Base.src", "base")]);
    rig.tick();

    rig.fs.add_file("root/app/Base.src", "oops\n#error here");
    rig.tick();

    let result = rig.compiling.last_result().ok_or("compiler should have run")?;
    assert!(!result.is_success());
    assert_eq!(result.errors[0].file, "app/Base.src");
    assert_eq!(result.errors[0].line, Some(2));

    assert_eq!(rig.sink.events().len(), 1);
    assert_eq!(text(&rig.artifacts.read("app/Base.res")?.unwrap_or_default()), "base");
    let progress = rig.compiling.progress();
    assert_eq!(progress.checks, 2);
    assert_eq!(progress.events, 1);
    Ok(())
}

#[test]
fn warnings_do_not_block_artifacts() -> TestResult {
    let mut rig = Rig::new(&[("Lib.src", "#warn deprecated")]);

    rig.tick();

    let result = rig.compiling.last_result().ok_or("compiler should have run")?;
    assert!(result.is_success());
    assert_eq!(result.warnings.len(), 1);
    assert!(rig.artifacts.contains("Lib.res"));
    Ok(())
}

#[test]
fn deleted_source_removes_artifact_and_module() -> TestResult {
    let mut rig = Rig::new(&[("app/Base.src", "base"), ("app/Main.src", "import app.Base\n\nmain")]);
    rig.tick();
    rig.loader.load("app.Main")?;

    rig.fs.remove_entry("root/app/Base.src");
    rig.tick();

    assert!(!rig.artifacts.contains("app/Base.res"));
    let events = rig.sink.events();
    assert_eq!(
        events[1].changes.deleted.iter().collect::<Vec<_>>(),
        vec!["app/Base.res"]
    );
    assert_eq!(
        rig.loader.load("app.Main").unwrap_err(),
        LoadError::MissingDependency {
            name: "app.Main".into(),
            missing: "app.Base".into()
        }
    );
    Ok(())
}

#[test]
fn only_changed_sources_are_recompiled() {
    let mut rig = Rig::new(&[("A.src", "a"), ("B.src", "b")]);
    rig.tick();

    rig.fs.add_file("root/B.src", "b2");
    rig.tick();
    rig.tick();

    assert_eq!(
        rig.compiling.compiler().invocations(),
        vec![
            vec!["A.src".to_string(), "B.src".to_string()],
            vec!["B.src".to_string()]
        ]
    );
    assert_eq!(rig.sink.events().len(), 2);
}

#[tokio::test]
async fn compiling_listener_waits_follow_the_monitor() -> TestResult {
    with_timeout(async {
        let fs = mock_tree(&[("Main.src", "main")]);
        let reader = Arc::new(DirectoryResourceStore::with_filesystem("root", Arc::new(fs.clone())));
        let artifacts = Arc::new(MemoryResourceStore::new());
        let compiling = Arc::new(CompilingListener::new(FakeCompiler::new(), reader, artifacts.clone()));
        let monitor = AlterationMonitor::with_filesystem(
            MonitorConfig::with_interval(FAST_INTERVAL),
            Arc::new(fs.clone()),
        );
        monitor.add_listener("root", compiling.clone());

        monitor.start()?;
        compiling.wait_for_first_check(WAIT).await?;
        assert!(artifacts.contains("Main.res"));

        let waiting = compiling.wait_for_event(WAIT);
        fs.add_file("root/Main.src", "main v2");
        waiting.await?;
        monitor.stop().await;

        assert_eq!(artifacts.read("Main.res")?, Some(b"main v2".to_vec()));
        Ok(())
    })
    .await
}
