// src/lib.rs

pub mod cli;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod fs;
pub mod listener;
pub mod loader;
pub mod logging;
pub mod monitor;
pub mod store;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::fs::RealFileSystem;
use crate::listener::{ReloadSink, ReloadingListener};
use crate::loader::{naming, ModuleLoader};
use crate::monitor::{scan, AlterationMonitor};
use crate::store::DirectoryResourceStore;
use crate::types::ReloadEvent;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, then CLI overrides)
/// - a directory-backed module loader
/// - the alteration monitor and its reloading listener
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;
    let root = cfg.root().clone();

    if args.once {
        print_snapshot(&root);
        return Ok(());
    }

    let store = Arc::new(DirectoryResourceStore::new(&root));
    let loader = Arc::new(ModuleLoader::new(store));

    let listener = Arc::new(ReloadingListener::new());
    // The loader must invalidate before the reporter reloads.
    listener.add_sink(loader.clone());
    listener.add_sink(Arc::new(ReportingSink {
        loader: Arc::clone(&loader),
    }));

    let monitor = AlterationMonitor::new(cfg.monitor_config());
    monitor.add_listener(&root, listener.clone());
    monitor.start()?;

    info!(root = ?root, interval = ?cfg.interval(), "watching for module changes (Ctrl-C to stop)");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    monitor.stop().await;

    let progress = listener.progress();
    info!(checks = progress.checks, events = progress.events, "reloadwatch finished");
    Ok(())
}

/// File values first (explicit `--config`, else `Reloadwatch.toml` if it
/// exists, else defaults), then CLI overrides, then validation.
fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => config::load_resolved(path)?,
        None => {
            let default_path = config::default_config_path();
            if default_path.is_file() {
                config::load_resolved(&default_path)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    if let Some(root) = &args.root {
        raw.monitor.root = root.clone();
    }
    if let Some(ms) = args.interval_ms {
        raw.monitor.interval_ms = ms;
    }

    Ok(ConfigFile::try_from(raw)?)
}

fn print_snapshot(root: &Path) {
    let result = scan(&RealFileSystem, root);
    println!("{} ({} files)", root.display(), result.snapshot.len());
    for entry in result.snapshot.iter() {
        println!("  {}  {} bytes", entry.path, entry.size);
    }
    for warning in &result.warnings {
        println!("  skipped {}: {}", warning.path.display(), warning.reason);
    }
}

/// Reloads every created or modified module after the loader has
/// invalidated, and logs what came back.
struct ReportingSink {
    loader: Arc<ModuleLoader>,
}

impl ReloadSink for ReportingSink {
    fn on_reload(&self, event: &ReloadEvent) {
        info!(%event, "reload event");

        for path in event.changes.created.iter().chain(event.changes.modified.iter()) {
            let Some(module) = naming::module_name(path) else {
                continue;
            };
            match self.loader.load(&module) {
                Ok(loaded) => info!(
                    module = %loaded.name,
                    digest = %blake3::hash(&loaded.bytes).to_hex(),
                    deps = ?loaded.dependencies,
                    "module reloaded"
                ),
                Err(err) => warn!(module = %module, error = %err, "module failed to reload"),
            }
        }

        for path in &event.changes.deleted {
            if let Some(module) = naming::module_name(path) {
                info!(module = %module, "module removed");
            }
        }
    }
}
