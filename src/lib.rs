// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod reload;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, ServeConfig};
use crate::context::BuildContext;
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{ConfigurationError, Result};
use crate::exec::RealExecutorBackend;
use crate::registry::TaskRegistry;
use crate::reload::{start_server, ReloadHub, ServerOptions};
use crate::types::Mode;

/// High-level entry point used by `main.rs`.
///
/// A target naming a serve profile starts an interactive session (startup
/// tasks, live-reload server, watcher). Any other target is a task run once
/// with `fail_fast` set.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let registry = TaskRegistry::from_config(&cfg)?;

    if args.list {
        print_list(&cfg, &registry);
        return Ok(());
    }

    let root = config_root_dir(&config_path);

    match cfg.serve_profile(&args.target) {
        Some(profile) => {
            if args.dry_run {
                return print_dry_run_profile(&args.target, profile, &registry);
            }
            run_interactive(&args, &cfg, &registry, profile, root).await
        }
        None => {
            if args.dry_run {
                return print_dry_run_task(&args.target, &registry);
            }
            run_once(&args, &cfg, &registry, root).await
        }
    }
}

/// Build `target` and its prerequisites once, then exit.
async fn run_once(
    args: &CliArgs,
    cfg: &ConfigFile,
    registry: &TaskRegistry,
    root: PathBuf,
) -> Result<()> {
    if !registry.contains(&args.target) {
        return Err(ConfigurationError::UnknownTask(args.target.clone()).into());
    }

    let mode = args.mode.unwrap_or(Mode::Production);
    info!(target = %args.target, mode = %mode.as_str(), "one-shot build");

    let section = cfg.config_section();
    let ctx = Arc::new(BuildContext::new(root, mode, true, section.cache_storage));
    let scheduler = Scheduler::new(registry, true);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);
    spawn_ctrl_c(rt_tx);

    let core = CoreRuntime::new(
        scheduler,
        section.triggered_while_running_behaviour,
        section.queue_length,
        RuntimeOptions::one_shot(),
    );
    Runtime::new(core, rt_rx, executor)
        .run(vec![args.target.clone()])
        .await
}

/// Run a serve profile until Ctrl-C or a fatal failure.
async fn run_interactive(
    args: &CliArgs,
    cfg: &ConfigFile,
    registry: &TaskRegistry,
    profile: &ServeConfig,
    root: PathBuf,
) -> Result<()> {
    let mode = args.mode.unwrap_or_else(|| profile.effective_mode());
    let section = cfg.config_section();
    let paths = cfg.paths();
    info!(profile = %args.target, mode = %mode.as_str(), "interactive session");

    let ctx = Arc::new(BuildContext::new(
        root.clone(),
        mode,
        false,
        section.cache_storage,
    ));
    let scheduler = Scheduler::new(registry, false);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);

    let hub = ReloadHub::default();
    let mut server_options = ServerOptions::new(
        root.clone(),
        args.port.or(profile.port).unwrap_or(section.port),
    );
    server_options.base_dirs = profile
        .base_dirs
        .iter()
        .map(|dir| PathBuf::from(paths.expand(dir)))
        .collect();
    server_options.routes = profile
        .routes
        .iter()
        .map(|(prefix, dir)| (prefix.clone(), PathBuf::from(paths.expand(dir))))
        .collect();
    let server = start_server(server_options, hub.clone()).await?;

    let bindings = crate::watch::build_bindings(profile, paths)?;
    let _watcher_handle = crate::watch::spawn_watcher(root, bindings, rt_tx.clone())?;

    spawn_ctrl_c(rt_tx);

    let core = CoreRuntime::new(
        scheduler,
        section.triggered_while_running_behaviour,
        section.queue_length,
        RuntimeOptions::interactive(),
    );
    let result = Runtime::new(core, rt_rx, executor)
        .with_reload(hub)
        .run(profile.before.clone())
        .await;

    server.shutdown().await;
    result
}

/// Ctrl-C -> graceful shutdown.
fn spawn_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "web/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_list(cfg: &ConfigFile, registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for def in registry.iter() {
        match &def.description {
            Some(desc) => println!("  {:<16} {desc}", def.name),
            None => println!("  {}", def.name),
        }
        if !def.after.is_empty() {
            println!("  {:<16} after: {}", "", def.after.join(", "));
        }
        if !def.sequence.is_empty() {
            println!("  {:<16} sequence: {}", "", def.sequence.join(" -> "));
        }
    }

    let profiles = cfg.serve_profiles();
    if !profiles.is_empty() {
        println!();
        println!("serve profiles ({}):", profiles.len());
        for (name, profile) in profiles.iter() {
            println!(
                "  {:<16} mode: {}, before: [{}]",
                name,
                profile.effective_mode().as_str(),
                profile.before.join(", ")
            );
        }
    }
}

fn print_dry_run_task(target: &str, registry: &TaskRegistry) -> Result<()> {
    let scheduler = Scheduler::new(registry, true);
    let order = scheduler.plan(target)?;

    println!("assetflow dry-run: {target}");
    for (idx, name) in order.iter().enumerate() {
        println!("  {}. {name}", idx + 1);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_dry_run_profile(name: &str, profile: &ServeConfig, registry: &TaskRegistry) -> Result<()> {
    let scheduler = Scheduler::new(registry, false);

    println!(
        "assetflow dry-run: serve profile {name} (mode: {})",
        profile.effective_mode().as_str()
    );
    for task in profile.before.iter() {
        let order = scheduler.plan(task)?;
        println!("  before {task}: {}", order.join(" -> "));
    }
    for binding in profile.watch.iter() {
        let tasks = if binding.tasks.is_empty() {
            "reload".to_string()
        } else {
            binding.tasks.join(", ")
        };
        println!("  watch {:?} -> {tasks}", binding.patterns);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
