// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::SettingsStore;
use crate::engine::{AppEvent, Runtime};
use crate::exec::{Dispatcher, LogRefresher, ProcessExecutor, valid_interpreter};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ProjectContext;
use crate::watch::path_utils::absolutize;
use crate::watch::{
    NotifyEventSource, ProjectWatcher, WatchService, build_rules, watch_targets,
};
use crate::workflow::{DiscoveryEnv, LocalTreeSync, LogAdvisorySink, WorkflowOrchestrator};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - dispatcher + process executor
/// - watch service on a `notify` source
/// - project watcher for the settings file and script root
/// - workflow orchestrator with the local tree sync
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let project_dir = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("determining current directory")?,
    };
    let ctx = ProjectContext::detect(absolutize(
        &std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        &project_dir,
    ));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let settings_path = absolutize(&ctx.project_dir, &args.config);
    let settings = Arc::new(
        SettingsStore::load(&settings_path, Arc::clone(&fs))
            .with_context(|| format!("loading settings from {:?}", settings_path))?,
    );

    if args.dry_run {
        print_dry_run(&settings, &ctx, fs.as_ref());
        return Ok(());
    }

    let handle = Handle::current();
    let (app_tx, app_rx) = mpsc::channel::<AppEvent>(64);

    let max_concurrent = args
        .max_concurrent_scripts
        .or(settings.snapshot().runtime.max_concurrent_scripts);
    let executor = Arc::new(ProcessExecutor::new(
        handle.clone(),
        max_concurrent,
        Arc::new(LogRefresher),
        Arc::clone(&fs),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&settings),
        ctx.clone(),
        Arc::clone(&fs),
        executor,
    ));

    let watch = Arc::new(WatchService::new(
        Arc::clone(&settings),
        ctx.clone(),
        Arc::clone(&fs),
        Arc::new(NotifyEventSource::new(handle.clone())),
        dispatcher,
    ));
    if !watch.update_configuration() {
        info!("watcher not running; waiting for a configuration change");
    }

    let project = Arc::new(ProjectWatcher::new(
        Arc::clone(&settings),
        ctx.clone(),
        Arc::clone(&fs),
        Arc::new(NotifyEventSource::new(handle.clone())),
        Arc::new(LogRefresher),
    ));
    project.update_configuration();

    let orchestrator = Arc::new(WorkflowOrchestrator::new(
        Arc::clone(&settings),
        ctx.clone(),
        Arc::clone(&fs),
        Arc::new(LocalTreeSync::new(handle, app_tx.clone(), Arc::clone(&fs))),
        Arc::new(LogAdvisorySink),
        DiscoveryEnv::from_process(ctx.platform),
    ));
    let config_changed = orchestrator.subscribe_config_changed();

    // Ctrl-C → graceful shutdown.
    {
        let tx = app_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(AppEvent::ShutdownRequested).await;
        });
    }

    if let Some(path) = &args.workflow {
        let path = absolutize(&ctx.project_dir, path);
        let text = fs
            .read_to_string(&path)
            .with_context(|| format!("reading workflow descriptor {:?}", path))?;
        if let Err(err) = orchestrator.prepare(&text) {
            warn!(error = %err, "workflow not started");
        }
    }
    drop(app_tx);

    Runtime::new(app_rx, config_changed, orchestrator, watch, project)
        .run()
        .await?;
    Ok(())
}

/// Dry-run output: resolved interpreter, rules and watch targets.
fn print_dry_run(settings: &SettingsStore, ctx: &ProjectContext, fs: &dyn FileSystem) {
    let snapshot = settings.snapshot();
    println!("syncwatch dry-run");
    println!("  settings = {}", settings.path().display());
    println!("  project_dir = {}", ctx.project_dir_str());
    match valid_interpreter(&snapshot, ctx, fs) {
        Some(path) => println!("  interpreter = {}", path.display()),
        None => println!("  interpreter = <invalid: {:?}>", snapshot.interpreter_path),
    }
    if let Some(n) = snapshot.runtime.max_concurrent_scripts {
        println!("  max_concurrent_scripts = {n}");
    }
    println!();

    let rules = build_rules(&snapshot, ctx, fs);
    println!("rules ({}):", rules.len());
    for rule in &rules {
        println!("  - {} -> {}", rule.watched_path, rule.script_path);
    }

    let targets = watch_targets(&rules, fs);
    println!("watch targets ({}):", targets.len());
    for target in &targets {
        let mode = if target.recursive { "recursive" } else { "flat" };
        println!("  - {} ({mode})", target.path.display());
    }

    debug!("dry-run complete (no execution)");
}
