// tests/config_validation.rs

use std::io::Write;

use tempfile::NamedTempFile;

use assetflow::config::{load_and_validate, parse_str, ConfigFile, StageConfig};
use assetflow::errors::{AssetflowError, ConfigurationError};
use assetflow::types::{CacheStorageMode, Mode, TriggerWhileRunningBehaviour};
use assetflow_test_utils::{ConfigFileBuilder, ServeConfigBuilder, TaskConfigBuilder};

fn validate(toml: &str) -> Result<ConfigFile, ConfigurationError> {
    ConfigFile::try_from(parse_str(toml).expect("toml should parse"))
}

#[test]
fn full_config_parses_with_defaults() {
    let cfg = validate(
        r#"
[paths]
src = "app"

[task.styles]
description = "Compile stylesheets"
src = ["{src}/styles/*.scss", "!{src}/styles/_*.scss"]
dest = "{tmp}/styles"

[[task.styles.stage]]
kind = "command"
cmd = "npx sass --stdin"
extension = "css"
only = "production"

[[task.styles.stage]]
kind = "rename"
dirname = "css"

[task.build]
after = ["styles"]
report = true

[serve.serve]
before = ["styles"]
base_dirs = ["{tmp}", "{src}"]
routes = { "/node_modules" = "node_modules" }

[[serve.serve.watch]]
patterns = ["{src}/styles/**/*.scss"]
tasks = ["styles"]

[[serve.serve.watch]]
patterns = ["{src}/*.html"]
"#,
    )
    .unwrap();

    let section = cfg.config_section();
    assert_eq!(
        section.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
    assert_eq!(section.queue_length, 1);
    assert_eq!(section.port, 9000);
    assert_eq!(section.cache_storage, CacheStorageMode::Memory);

    let paths = cfg.paths();
    assert_eq!(paths.expand("{src}/a/{tmp}/{dist}"), "app/a/.tmp/dist");

    let styles = &cfg.tasks()["styles"];
    assert_eq!(styles.description.as_deref(), Some("Compile stylesheets"));
    assert_eq!(styles.stages.len(), 2);
    assert!(matches!(
        &styles.stages[0],
        StageConfig::Command { only: Some(Mode::Production), extension: Some(ext), cache: false, .. } if ext == "css"
    ));
    assert!(cfg.tasks()["build"].report);

    let serve = cfg.serve_profile("serve").unwrap();
    assert_eq!(serve.effective_mode(), Mode::Development);
    assert_eq!(serve.watch.len(), 2);
    assert!(serve.watch[1].tasks.is_empty());
    assert_eq!(serve.routes["/node_modules"], "node_modules");
}

#[test]
fn unknown_prerequisite_is_rejected() {
    let err = validate(
        r#"
[task.a]
after = ["ghost"]
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::UnknownPrerequisite {
            task: "a".to_string(),
            prerequisite: "ghost".to_string(),
        }
    );
}

#[test]
fn cycle_is_rejected_and_named() {
    let err = validate(
        r#"
[task.a]
after = ["c"]

[task.b]
after = ["a"]

[task.c]
after = ["b"]
"#,
    )
    .unwrap_err();
    match err {
        ConfigurationError::CyclicDependency(path) => {
            assert_eq!(path.first(), path.last());
            for name in ["a", "b", "c"] {
                assert!(path.iter().any(|n| n == name), "{name} missing from {path:?}");
            }
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let err = validate(
        r#"
[task.a]
after = ["a"]
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::CyclicDependency(vec!["a".to_string(), "a".to_string()])
    );
}

#[test]
fn empty_config_and_zero_queue_length_are_invalid() {
    assert!(matches!(validate(""), Err(ConfigurationError::Invalid(_))));

    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new().build())
        .with_queue_length(0)
        .raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(ConfigurationError::Invalid(msg)) if msg.contains("queue_length")
    ));
}

#[test]
fn serve_profile_must_reference_known_tasks() {
    let raw = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::new().build())
        .with_serve("serve", ServeConfigBuilder::new().before("scripts").build())
        .raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(ConfigurationError::Invalid(msg)) if msg.contains("scripts")
    ));

    let raw = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::new().build())
        .with_serve(
            "serve",
            ServeConfigBuilder::new().watch(&["src/**/*.js"], &["scripts"]).build(),
        )
        .raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn profile_and_task_names_must_not_clash() {
    let raw = ConfigFileBuilder::new()
        .with_task("serve", TaskConfigBuilder::new().build())
        .with_serve("serve", ServeConfigBuilder::new().build())
        .raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(ConfigurationError::Invalid(_))
    ));
}

#[test]
fn stages_require_sources_and_dev_dest_requires_dest() {
    let err = validate(
        r#"
[task.lint]
[[task.lint.stage]]
kind = "lint"
cmd = "eslint --stdin"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(msg) if msg.contains("src")));

    let err = validate(
        r#"
[task.fonts]
src = ["src/fonts/**/*"]
dev_dest = ".tmp/fonts"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(msg) if msg.contains("dev_dest")));
}

#[test]
fn unknown_stage_kind_is_a_parse_error() {
    let result = parse_str(
        r#"
[task.a]
src = ["src/*.js"]
[[task.a.stage]]
kind = "teleport"
"#,
    );
    assert!(matches!(result, Err(AssetflowError::Toml(_))));
}

#[test]
fn load_and_validate_reports_configuration_errors() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[task.A]
after = ["B"]

[task.B]
after = ["A"]
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(AssetflowError::Config(ConfigurationError::CyclicDependency(path))) => {
            assert!(path.contains(&"A".to_string()));
            assert!(path.contains(&"B".to_string()));
        }
        Err(e) => panic!("Expected CyclicDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Assetflow.toml"));
    assert!(matches!(result, Err(AssetflowError::Io(_))));
}

#[test]
fn sequence_entries_must_be_known_and_listed_once() {
    let unknown = validate(
        r#"
[task.clean]
[task.default]
sequence = ["clean", "build"]
"#,
    );
    assert_eq!(
        unknown.unwrap_err(),
        ConfigurationError::UnknownPrerequisite {
            task: "default".to_string(),
            prerequisite: "build".to_string(),
        }
    );

    let repeated = validate(
        r#"
[task.clean]
[task.default]
sequence = ["clean", "clean"]
"#,
    );
    assert!(matches!(repeated, Err(ConfigurationError::Invalid(msg)) if msg.contains("twice")));
}

#[test]
fn sequence_edges_take_part_in_cycle_detection() {
    let result = validate(
        r#"
[task.a]
sequence = ["b"]

[task.b]
after = ["a"]
"#,
    );
    assert!(matches!(result, Err(ConfigurationError::CyclicDependency(_))));
}

#[test]
fn sample_project_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Assetflow.toml");
    let cfg = load_and_validate(&path).unwrap();

    let default = cfg.tasks().get("default").unwrap();
    assert_eq!(default.sequence, vec!["clean", "build", "modernizr"]);
    assert!(default.after.is_empty());

    let modernizr = cfg.tasks().get("modernizr").unwrap();
    assert!(matches!(
        modernizr.stages.first(),
        Some(StageConfig::Bundle { output, .. }) if output == "modernizr.js"
    ));
}
