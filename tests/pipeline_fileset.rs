// tests/pipeline_fileset.rs

mod common;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::config::{PathsSection, StageConfig};
use assetflow::context::BuildContext;
use assetflow::engine::{TaskFailure, TaskOutcome};
use assetflow::errors::TransformError;
use assetflow::fs::mock::MockFileSystem;
use assetflow::pipeline::cache::MemoryCacheStore;
use assetflow::pipeline::stages::{build_stage, RenameStage};
use assetflow::pipeline::{
    execute, FileSet, PipelineError, PipelineWork, Selector, SourceFile, SourceGlobs, StageOutput,
    TransformStage,
};
use assetflow::pipeline::stage::StageFuture;
use assetflow::pipeline::writer::OutputWriter;
use assetflow::registry::TaskWork;
use assetflow::types::Mode;
use assetflow_test_utils::{init_tracing, TaskConfigBuilder};

use crate::common::mock_fs;

type TestResult = Result<(), Box<dyn Error>>;

fn ctx(fs: &MockFileSystem, mode: Mode, fail_fast: bool) -> BuildContext {
    BuildContext::with_parts(
        ".",
        mode,
        fail_fast,
        Arc::new(fs.clone()),
        Arc::new(MemoryCacheStore::new()),
    )
}

fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn text(fs: &MockFileSystem, path: &str) -> Option<String> {
    fs.contents(Path::new(".").join(path))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Uppercases every file; rejects files containing "bad".
#[derive(Debug)]
struct ShoutStage;

impl TransformStage for ShoutStage {
    fn name(&self) -> &str {
        "shout"
    }

    fn apply<'a>(&'a self, files: FileSet, _ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = StageOutput::default();
            for file in files {
                let body = String::from_utf8_lossy(&file.contents).into_owned();
                if body.contains("bad") {
                    out.errors.push(TransformError::new(
                        "shout",
                        Some(file.path.clone()),
                        "refusing bad input",
                    ));
                    continue;
                }
                out.files.insert(SourceFile {
                    contents: body.to_uppercase().into_bytes(),
                    ..file
                });
            }
            Ok(out)
        })
    }
}

#[test]
fn globs_strip_their_base_and_honour_exclusions() -> TestResult {
    let fs = mock_fs();
    let sources = SourceGlobs::new(
        &patterns(&["src/styles/*.css", "!src/styles/_*.css"]),
        None,
    )?;
    let set = sources.resolve(&fs, Path::new("."))?;
    assert_eq!(set.paths(), vec![PathBuf::from("main.css")]);

    let deep = SourceGlobs::new(&patterns(&["src/styles/**/*.css"]), None)?;
    let set = deep.resolve(&fs, Path::new("."))?;
    assert_eq!(
        set.paths(),
        vec![
            PathBuf::from("_vars.css"),
            PathBuf::from("main.css"),
            PathBuf::from("vendor/reset.css"),
        ]
    );
    Ok(())
}

#[test]
fn base_override_keeps_directory_structure() -> TestResult {
    let fs = mock_fs();
    let sources = SourceGlobs::new(&patterns(&["src/styles/main.css"]), Some("src"))?;
    let set = sources.resolve(&fs, Path::new("."))?;
    assert_eq!(set.paths(), vec![PathBuf::from("styles/main.css")]);
    Ok(())
}

#[test]
fn missing_glob_base_matches_nothing() -> TestResult {
    let fs = mock_fs();
    let sources = SourceGlobs::new(&patterns(&["src/nowhere/*.css"]), None)?;
    assert!(sources.resolve(&fs, Path::new("."))?.is_empty());
    Ok(())
}

#[test]
fn selector_patterns_without_slash_match_file_names() -> TestResult {
    let selector = Selector::new(&patterns(&["*.js"]))?;
    assert!(selector.selects(&SourceFile::new("deep/dir/app.js", "")));
    assert!(!selector.selects(&SourceFile::new("deep/dir/app.css", "")));
    assert!(Selector::all().selects(&SourceFile::new("anything", "")));
    Ok(())
}

#[tokio::test]
async fn execute_writes_below_destination() -> TestResult {
    init_tracing();
    let fs = mock_fs();
    let ctx = ctx(&fs, Mode::Production, true);
    let sources = SourceGlobs::new(
        &patterns(&["src/scripts/**/*.js", "!src/scripts/**/*.test.js"]),
        None,
    )?;
    let stages: Vec<Arc<dyn TransformStage>> = vec![Arc::new(ShoutStage)];

    let run = execute(&sources, &stages, Some(Path::new("dist/scripts")), &ctx, "scripts").await?;

    assert_eq!(
        run.written,
        vec![
            PathBuf::from("dist/scripts/app.js"),
            PathBuf::from("dist/scripts/lib/util.js"),
        ]
    );
    assert_eq!(text(&fs, "dist/scripts/app.js").as_deref(), Some("LET A = 1;"));
    assert_eq!(run.bytes, "LET A = 1;".len() + "EXPORT {};".len());
    assert!(run.errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn fail_fast_writes_nothing() -> TestResult {
    let fs = mock_fs();
    fs.add_file("./src/scripts/broken.js", "bad code");
    let ctx = ctx(&fs, Mode::Production, true);
    let sources = SourceGlobs::new(&patterns(&["src/scripts/*.js"]), None)?;
    let stages: Vec<Arc<dyn TransformStage>> = vec![Arc::new(ShoutStage)];

    let result = execute(&sources, &stages, Some(Path::new("dist")), &ctx, "scripts").await;

    match result {
        Err(PipelineError::Transform(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].stage, "shout");
            assert_eq!(errors[0].file, Some(PathBuf::from("broken.js")));
        }
        other => panic!("expected transform error, got {other:?}"),
    }
    assert!(text(&fs, "dist/app.js").is_none());
    Ok(())
}

#[tokio::test]
async fn without_fail_fast_survivors_are_written() -> TestResult {
    let fs = mock_fs();
    fs.add_file("./src/scripts/broken.js", "bad code");
    let ctx = ctx(&fs, Mode::Development, false);
    let sources = SourceGlobs::new(
        &patterns(&["src/scripts/*.js", "!src/scripts/*.test.js"]),
        None,
    )?;
    let stages: Vec<Arc<dyn TransformStage>> = vec![Arc::new(ShoutStage)];

    let run = execute(&sources, &stages, Some(Path::new("dist")), &ctx, "scripts").await?;

    assert_eq!(run.written, vec![PathBuf::from("dist/app.js")]);
    assert_eq!(run.errors.len(), 1);
    assert!(text(&fs, "dist/broken.js").is_none());
    Ok(())
}

#[tokio::test]
async fn stage_limited_to_production_is_skipped_in_development() -> TestResult {
    let fs = mock_fs();
    let sources = SourceGlobs::new(&patterns(&["src/styles/main.css"]), None)?;
    let minify: Vec<Arc<dyn TransformStage>> = vec![Arc::new(RenameStage::new(
        Some("min.css".to_string()),
        None,
        Selector::all(),
        Some(Mode::Production),
    ))];

    let dev = execute(&sources, &minify, Some(Path::new("out")), &ctx(&fs, Mode::Development, true), "styles").await?;
    assert_eq!(dev.written, vec![PathBuf::from("out/main.css")]);

    let prod = execute(&sources, &minify, Some(Path::new("out")), &ctx(&fs, Mode::Production, true), "styles").await?;
    assert_eq!(prod.written, vec![PathBuf::from("out/main.min.css")]);
    Ok(())
}

#[tokio::test]
async fn configured_stages_filter_rename_and_concat() -> TestResult {
    let fs = mock_fs();
    let paths = PathsSection::default();
    let stages = vec![
        build_stage(
            &StageConfig::Filter {
                patterns: patterns(&["**/*.js", "!**/*.test.js"]),
                only: None,
            },
            &paths,
        )?,
        build_stage(
            &StageConfig::Concat {
                output: "bundle.js".to_string(),
                separator: Some(";\n".to_string()),
                when: patterns(&["*.js"]),
                only: None,
            },
            &paths,
        )?,
        build_stage(
            &StageConfig::Rename {
                extension: None,
                dirname: Some("js".to_string()),
                when: vec![],
                only: None,
            },
            &paths,
        )?,
    ];
    let sources = SourceGlobs::new(&patterns(&["src/scripts/**/*"]), None)?;

    let run = execute(&sources, &stages, Some(Path::new("dist")), &ctx(&fs, Mode::Production, true), "scripts").await?;

    assert_eq!(run.written, vec![PathBuf::from("dist/js/bundle.js")]);
    assert_eq!(
        text(&fs, "dist/js/bundle.js").as_deref(),
        Some("let a = 1;;\nexport {};")
    );
    Ok(())
}

#[tokio::test]
async fn destination_depends_on_mode() -> TestResult {
    let fs = mock_fs();
    let task = TaskConfigBuilder::new()
        .src("{src}/fonts/**/*")
        .dest("{dist}/fonts")
        .dev_dest("{tmp}/fonts")
        .build();
    let work = PipelineWork::from_config(&task, &PathsSection::default())?;

    assert_eq!(work.destination(Mode::Development), Some(Path::new(".tmp/fonts")));
    assert_eq!(work.destination(Mode::Production), Some(Path::new("dist/fonts")));

    let report = work.run("fonts", &ctx(&fs, Mode::Development, false)).await;
    assert_eq!(report.outcome, TaskOutcome::Success);
    assert_eq!(report.written, vec![PathBuf::from(".tmp/fonts/icons.woff")]);
    assert!(text(&fs, "dist/fonts/icons.woff").is_none());

    let report = work.run("fonts", &ctx(&fs, Mode::Production, true)).await;
    assert_eq!(report.written, vec![PathBuf::from("dist/fonts/icons.woff")]);
    Ok(())
}

#[tokio::test]
async fn rerunning_a_task_is_idempotent() -> TestResult {
    let fs = mock_fs();
    let task = TaskConfigBuilder::new()
        .src("{src}/styles/*.css")
        .dest("{dist}/styles")
        .build();
    let work = PipelineWork::from_config(&task, &PathsSection::default())?;
    let ctx = ctx(&fs, Mode::Production, true);

    let first = work.run("styles", &ctx).await;
    let files_after_first = fs.file_paths();
    let second = work.run("styles", &ctx).await;

    assert_eq!(first, second);
    assert_eq!(files_after_first, fs.file_paths());
    assert_eq!(text(&fs, "dist/styles/main.css").as_deref(), Some("body {}"));
    Ok(())
}

#[tokio::test]
async fn clean_removes_directories_before_building() -> TestResult {
    let fs = mock_fs();
    fs.add_file("./dist/stale.txt", "old");
    let task = TaskConfigBuilder::new()
        .clean("{dist}")
        .src("{src}/index.html")
        .dest("{dist}")
        .build();
    let work = PipelineWork::from_config(&task, &PathsSection::default())?;

    let report = work.run("html", &ctx(&fs, Mode::Production, true)).await;

    assert!(report.outcome.is_success());
    assert!(text(&fs, "dist/stale.txt").is_none());
    assert_eq!(text(&fs, "dist/index.html").as_deref(), Some("<html></html>"));
    Ok(())
}

#[tokio::test]
async fn transform_failure_is_reported_with_written_files() -> TestResult {
    let fs = mock_fs();
    fs.add_file("./src/scripts/broken.js", "bad code");
    let sources = SourceGlobs::new(&patterns(&["src/scripts/*.js"]), None)?;
    let stages: Vec<Arc<dyn TransformStage>> = vec![Arc::new(ShoutStage)];
    let run = execute(&sources, &stages, None, &ctx(&fs, Mode::Development, false), "lint").await?;

    // No destination: nothing written, errors still collected.
    assert!(run.written.is_empty());
    assert_eq!(run.errors.len(), 1);

    let failure = TaskFailure::Transform(run.errors);
    assert!(!failure.is_fatal());
    assert!(failure.to_string().contains("refusing bad input"));
    Ok(())
}

#[tokio::test]
async fn rename_collision_is_a_transform_error() -> TestResult {
    let fs = mock_fs();
    let stage = RenameStage::new(Some("css".to_string()), None, Selector::all(), None);
    let files = FileSet::from_files([
        SourceFile::new("a.sass", b"a {}".to_vec()).with_origin("src/styles/a.sass"),
        SourceFile::new("a.scss", b"b {}".to_vec()).with_origin("src/styles/a.scss"),
        SourceFile::new("b.scss", b"c {}".to_vec()),
    ]);

    let out = stage.apply(files, &ctx(&fs, Mode::Production, false)).await?;

    assert_eq!(out.files.paths(), vec![PathBuf::from("a.css"), PathBuf::from("b.css")]);
    assert_eq!(out.errors.len(), 1);
    let err = &out.errors[0];
    assert_eq!(err.stage, "rename");
    assert_eq!(err.file, Some(PathBuf::from("a.css")));
    assert_eq!(
        err.message,
        "`src/styles/a.sass` and `src/styles/a.scss` both map to `a.css`"
    );
    Ok(())
}

#[tokio::test]
async fn flattening_directories_reports_each_clash() -> TestResult {
    let fs = mock_fs();
    let stage = RenameStage::new(None, Some("fonts".to_string()), Selector::all(), None);
    let files = FileSet::from_files([
        SourceFile::new("open/icons.woff", b"1".to_vec()),
        SourceFile::new("roboto/icons.woff", b"2".to_vec()),
        SourceFile::new("roboto/bold.woff", b"3".to_vec()),
    ]);

    let out = stage.apply(files, &ctx(&fs, Mode::Development, false)).await?;

    assert_eq!(
        out.files.paths(),
        vec![PathBuf::from("fonts/bold.woff"), PathBuf::from("fonts/icons.woff")]
    );
    assert_eq!(out.errors.len(), 1);
    assert!(out.errors[0].message.contains("`roboto/icons.woff`"));
    Ok(())
}

#[tokio::test]
async fn writer_forgets_path_locks_once_writes_finish() -> TestResult {
    let fs = mock_fs();
    let writer = Arc::new(OutputWriter::new(Arc::new(fs.clone())));

    let mut handles = Vec::new();
    for i in 0..20 {
        let writer = Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            let path = PathBuf::from(format!("./dist/file-{}.txt", i % 5));
            writer.write(&path, format!("{i}").as_bytes()).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(writer.tracked_paths(), 0);
    assert!(text(&fs, "dist/file-0.txt").is_some());
    assert!(text(&fs, "dist/file-4.txt").is_some());
    Ok(())
}
