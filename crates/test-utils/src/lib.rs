pub mod fake_compiler;
pub mod recording;

pub use fake_compiler::FakeCompiler;
pub use recording::{RecordingListener, RecordingSink};

use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Poll interval used by tests that run a real monitor.
pub const FAST_INTERVAL: Duration = Duration::from_millis(25);

/// Generous upper bound for a single wait in tests.
pub const WAIT: Option<Duration> = Some(Duration::from_secs(5));

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Body of a module artifact importing `imports`.
pub fn module_source(imports: &[&str], body: &str) -> String {
    let mut text = String::new();
    for import in imports {
        text.push_str("import ");
        text.push_str(import);
        text.push('\n');
    }
    text.push('\n');
    text.push_str(body);
    text.push('\n');
    text
}

/// Write the artifact for `module` below `root`, creating directories.
pub fn write_module(root: &Path, module: &str, imports: &[&str], body: &str) -> anyhow::Result<()> {
    let path = root.join(reloadwatch::loader::naming::resource_name(module));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, module_source(imports, body))?;
    Ok(())
}

/// Remove the artifact for `module` below `root`.
pub fn remove_module(root: &Path, module: &str) -> anyhow::Result<()> {
    std::fs::remove_file(root.join(reloadwatch::loader::naming::resource_name(module)))?;
    Ok(())
}
