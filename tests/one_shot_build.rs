// tests/one_shot_build.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use assetflow::cli::CliArgs;
use assetflow::config::load_and_validate;
use assetflow::context::BuildContext;
use assetflow::dag::Scheduler;
use assetflow::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use assetflow::errors::{AssetflowError, ConfigurationError};
use assetflow::exec::RealExecutorBackend;
use assetflow::registry::TaskRegistry;
use assetflow::types::{CacheStorageMode, Mode};
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[task.styles]
src = ["{src}/styles/*.css", "!{src}/styles/_*.css"]
dest = "{dist}/styles"
dev_dest = "{tmp}/styles"

[[task.styles.stage]]
kind = "command"
cmd = "tr a-z A-Z"

[task.scripts]
src = ["{src}/scripts/*.js"]
dest = "{dist}/scripts"

[[task.scripts.stage]]
kind = "concat"
output = "app.js"
separator = "\n"

[task.broken]
src = ["{src}/scripts/*.js"]
dest = "{dist}/broken"

[[task.broken.stage]]
kind = "command"
cmd = "echo 'unexpected token' >&2; exit 2"

[task.build]
description = "Production build"
after = ["styles", "scripts"]
report = true
"#;

fn write(root: &Path, rel: &str, contents: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

fn project() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "Assetflow.toml", CONFIG)?;
    write(dir.path(), "src/styles/main.css", "body {}")?;
    write(dir.path(), "src/styles/_vars.css", ":root {}")?;
    write(dir.path(), "src/scripts/a.js", "a();")?;
    write(dir.path(), "src/scripts/b.js", "b();")?;
    Ok(dir)
}

async fn run_target(root: &Path, target: &str, mode: Mode) -> assetflow::errors::Result<()> {
    let cfg = load_and_validate(root.join("Assetflow.toml"))?;
    let registry = TaskRegistry::from_config(&cfg)?;
    let ctx = Arc::new(BuildContext::new(root, mode, true, CacheStorageMode::Memory));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);
    let core = CoreRuntime::new(
        Scheduler::new(&registry, true),
        cfg.config_section().triggered_while_running_behaviour,
        cfg.config_section().queue_length,
        RuntimeOptions::one_shot(),
    );
    Runtime::new(core, rt_rx, executor)
        .run(vec![target.to_string()])
        .await
}

#[tokio::test]
async fn build_writes_production_output() -> TestResult {
    init_tracing();
    let dir = project()?;

    with_timeout(run_target(dir.path(), "build", Mode::Production)).await?;

    let root = dir.path();
    assert_eq!(fs::read_to_string(root.join("dist/styles/main.css"))?, "BODY {}");
    assert!(!root.join("dist/styles/_vars.css").exists());
    assert_eq!(fs::read_to_string(root.join("dist/scripts/app.js"))?, "a();\nb();");
    assert!(!root.join(".tmp").exists());
    Ok(())
}

#[tokio::test]
async fn development_mode_uses_dev_destination() -> TestResult {
    let dir = project()?;

    with_timeout(run_target(dir.path(), "styles", Mode::Development)).await?;

    assert!(dir.path().join(".tmp/styles/main.css").is_file());
    assert!(!dir.path().join("dist/styles").exists());
    Ok(())
}

#[tokio::test]
async fn failing_stage_fails_the_build_and_writes_nothing() -> TestResult {
    let dir = project()?;

    let result = with_timeout(run_target(dir.path(), "broken", Mode::Production)).await;

    match result {
        Err(AssetflowError::TaskFailed { task, message }) => {
            assert_eq!(task, "broken");
            assert!(message.contains("unexpected token"), "message: {message}");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert!(!dir.path().join("dist/broken").exists());
    Ok(())
}

fn args(dir: &Path, target: &str) -> CliArgs {
    CliArgs {
        target: target.to_string(),
        config: dir.join("Assetflow.toml").to_string_lossy().into_owned(),
        mode: None,
        port: None,
        log_level: None,
        dry_run: false,
        list: false,
    }
}

#[tokio::test]
async fn cli_entry_point_builds_and_rejects_unknown_targets() -> TestResult {
    let dir = project()?;

    with_timeout(assetflow::run(args(dir.path(), "build"))).await?;
    assert!(dir.path().join("dist/scripts/app.js").is_file());

    let result = with_timeout(assetflow::run(args(dir.path(), "deploy"))).await;
    assert!(matches!(
        result,
        Err(AssetflowError::Config(ConfigurationError::UnknownTask(name))) if name == "deploy"
    ));
    Ok(())
}

#[tokio::test]
async fn dry_run_and_list_execute_nothing() -> TestResult {
    let dir = project()?;

    let mut dry = args(dir.path(), "build");
    dry.dry_run = true;
    with_timeout(assetflow::run(dry)).await?;

    let mut list = args(dir.path(), "build");
    list.list = true;
    with_timeout(assetflow::run(list)).await?;

    assert!(!dir.path().join("dist").exists());
    Ok(())
}
