// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod patterns;
pub mod pipeline;
pub mod render;
pub mod template;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::server::spawn_server;
use crate::exec::{ExecutorSet, SchedulerBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::patterns::expand;
use crate::pipeline::{PipelineScheduler, RunSummary};
use crate::watch::{spawn_debouncer, spawn_watcher, HashFilter, LogReloadNotifier, WatchRules};

/// Pipeline run by `default` and when no subcommand is given.
pub const DEFAULT_PIPELINE: &str = "default";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading, placeholder resolution and validation
/// - the pipeline scheduler with the built-in executors
/// - for `watch`: preview server, file watcher, debouncer, runtime and
///   Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let command = args.command();

    if args.dry_run {
        print_dry_run(&cfg, &command);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut scheduler = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), Arc::clone(&fs))?;

    let summary = match command {
        Command::Build => scheduler.run_pipeline("build").await?,
        Command::Compile => scheduler.run_pipeline("compile").await?,
        Command::Default => scheduler.run_pipeline(DEFAULT_PIPELINE).await?,
        Command::Run { name } => scheduler.run_target(&name).await?,
        Command::Watch => return run_watch(cfg, scheduler, fs).await,
    };

    report_summary(&summary);
    Ok(())
}

/// `watch`: initial build, optional preview server, then incremental runs
/// until Ctrl-C.
async fn run_watch(
    cfg: ConfigFile,
    mut scheduler: PipelineScheduler,
    fs: Arc<dyn FileSystem>,
) -> Result<()> {
    let initial = scheduler
        .run_pipeline(&cfg.config.watch_pipeline)
        .await
        .context("initial build failed")?;
    report_summary(&initial);

    let rules = WatchRules::from_config(&cfg)?;
    let root = cfg.root().to_path_buf();

    let server = match &cfg.server {
        Some(section) => Some(spawn_server(section, &root)?),
        None => None,
    };

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Watcher -> debouncer -> runtime.
    let (path_tx, path_rx) = mpsc::unbounded_channel::<String>();
    let watcher = spawn_watcher(root.clone(), path_tx)?;

    let filter = if cfg.config.use_hash {
        let mut filter = HashFilter::new(root.clone(), Arc::clone(&fs));
        let watched = watched_files(&rules, fs.as_ref(), &root);
        debug!(count = watched.len(), "priming content hashes");
        filter.prime(watched.iter().map(String::as_str));
        Some(filter)
    } else {
        None
    };
    let debouncer = spawn_debouncer(
        path_rx,
        Duration::from_millis(cfg.config.debounce_ms),
        rt_tx.clone(),
        filter,
    );

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let backend = SchedulerBackend::new(Arc::new(Mutex::new(scheduler)), rt_tx);
    let core = CoreRuntime::new(rules, RuntimeOptions::default());
    let result = Runtime::new(core, rt_rx, backend, LogReloadNotifier).run().await;

    // Release the watch handle before tearing down the rest.
    drop(watcher);
    debouncer.abort();
    if let Some(server) = server {
        server.shutdown().await;
    }

    result.map_err(anyhow::Error::from)
}

/// Every file currently matched by a watch rule, relative to `root`.
fn watched_files(rules: &WatchRules, fs: &dyn FileSystem, root: &std::path::Path) -> Vec<String> {
    let mut files = Vec::new();
    for rule in rules.rules() {
        match expand(fs, root, "", rule.patterns()) {
            Ok(expansion) => files.extend(expansion.files),
            Err(err) => warn!(rule = %rule.name(), error = %err, "cannot list watched files"),
        }
    }
    files.sort();
    files.dedup();
    files
}

fn report_summary(summary: &RunSummary) {
    info!(
        run = %summary.label,
        tasks = summary.tasks.len(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "done"
    );
}

/// Dry-run output: resolved pipelines, tasks and watch rules.
fn print_dry_run(cfg: &ConfigFile, command: &Command) {
    println!("assetpipe dry-run");
    println!("  config: {}", cfg.source.path.display());
    println!("  root: {}", cfg.root().display());
    println!("  command: {command:?}");
    println!();

    println!("pipelines ({}):", cfg.pipelines.len());
    for (name, tasks) in &cfg.pipelines {
        println!("  - {name}: {}", tasks.join(", "));
        if let Some(declared) = cfg.declared_pipelines.get(name) {
            if declared != tasks {
                println!("      declared: {}", declared.join(", "));
            }
        }
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in &cfg.task {
        println!("  - {name} [{}]", task.executor);
        if let Some(ref d) = task.description {
            println!("      description: {d}");
        }
        if !task.inputs.is_empty() {
            let groups: Vec<&str> = task.inputs.keys().map(String::as_str).collect();
            println!("      inputs: {}", groups.join(", "));
        }
        if let Some(ref out) = task.output {
            println!("      output: {out}");
        }
    }
    println!();

    println!("watch rules ({}):", cfg.watch.len());
    for rule in &cfg.watch {
        println!("  - {}: {:?} -> {}", rule.name, rule.files, rule.tasks.join(", "));
    }

    debug!("dry-run complete (no execution)");
}
