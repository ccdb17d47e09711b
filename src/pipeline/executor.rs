// src/pipeline/executor.rs

//! Runs one task's file pipeline: resolve sources, apply stages, write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{PathsSection, TaskConfig};
use crate::context::BuildContext;
use crate::engine::TaskFailure;
use crate::errors::TransformError;
use crate::pipeline::sources::SourceGlobs;
use crate::pipeline::stage::{stage_enabled, TransformStage};
use crate::pipeline::stages::build_stage;
use crate::registry::{TaskReport, TaskWork, WorkFuture};
use crate::types::Mode;

/// A pipeline that ran to the write step.
#[derive(Debug, Default)]
pub struct PipelineRun {
    /// Destination paths written, relative to the project root.
    pub written: Vec<PathBuf>,
    /// Files left after the last stage, written or not.
    pub files: usize,
    /// Their total size in bytes.
    pub bytes: usize,
    /// Recoverable errors collected when `fail_fast` is off.
    pub errors: Vec<TransformError>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage reported errors and `fail_fast` is on. Nothing was written.
    #[error("{} transform error(s)", .0.len())]
    Transform(Vec<TransformError>),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Resolve `sources`, run `stages` in order and write the result below
/// `destination` (relative to the project root).
///
/// With no destination the stages still run (lint-only tasks) but nothing
/// is written.
pub async fn execute(
    sources: &SourceGlobs,
    stages: &[Arc<dyn TransformStage>],
    destination: Option<&Path>,
    ctx: &BuildContext,
    task: &str,
) -> Result<PipelineRun, PipelineError> {
    let mut files = sources.resolve(ctx.fs(), ctx.root())?;
    debug!(task = %task, files = files.len(), "resolved sources");

    let mut errors: Vec<TransformError> = Vec::new();

    for stage in stages {
        if !stage_enabled(stage.as_ref(), ctx.mode()) {
            debug!(task = %task, stage = %stage.name(), mode = %ctx.mode(), "stage disabled in this mode");
            continue;
        }

        let output = stage.apply(files, ctx).await?;

        if !output.errors.is_empty() {
            for err in output.errors.iter() {
                error!(task = %task, "{}", err);
            }
            if ctx.fail_fast() {
                return Err(PipelineError::Transform(output.errors));
            }
            errors.extend(output.errors);
        }

        files = output.files;
    }

    let mut run = PipelineRun {
        files: files.len(),
        bytes: files.total_bytes(),
        errors,
        ..PipelineRun::default()
    };

    let Some(destination) = destination else {
        return Ok(run);
    };

    for file in files {
        let rel = destination.join(&file.path);
        ctx.writer()
            .write(&ctx.resolve(&rel), &file.contents)
            .await?;
        run.written.push(rel);
    }

    Ok(run)
}

/// The work of a `[task.<name>]` section.
#[derive(Debug, Default)]
pub struct PipelineWork {
    clean: Vec<PathBuf>,
    sources: Option<SourceGlobs>,
    stages: Vec<Arc<dyn TransformStage>>,
    dest: Option<PathBuf>,
    dev_dest: Option<PathBuf>,
    report: bool,
}

impl PipelineWork {
    pub fn from_config(config: &TaskConfig, paths: &PathsSection) -> anyhow::Result<Self> {
        let sources = if config.src.is_empty() {
            None
        } else {
            let patterns = paths.expand_all(&config.src);
            let base = config.base.as_deref().map(|b| paths.expand(b));
            Some(SourceGlobs::new(&patterns, base.as_deref())?)
        };

        let stages = config
            .stages
            .iter()
            .map(|stage| build_stage(stage, paths))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            clean: paths.expand_all(&config.clean).into_iter().map(PathBuf::from).collect(),
            sources,
            stages,
            dest: config.dest.as_deref().map(|d| PathBuf::from(paths.expand(d))),
            dev_dest: config.dev_dest.as_deref().map(|d| PathBuf::from(paths.expand(d))),
            report: config.report,
        })
    }

    /// Destination for `mode`: `dev_dest` in development when set, else `dest`.
    pub fn destination(&self, mode: Mode) -> Option<&Path> {
        match (mode, &self.dev_dest) {
            (Mode::Development, Some(dev)) => Some(dev.as_path()),
            _ => self.dest.as_deref(),
        }
    }

    async fn run_inner(&self, task: &str, ctx: &BuildContext) -> TaskReport {
        for dir in self.clean.iter() {
            info!(task = %task, dir = ?dir, "cleaning");
            if let Err(err) = ctx.fs().remove_dir_all(&ctx.resolve(dir)) {
                return TaskReport::failed(TaskFailure::Fatal(format!("{err:#}")), Vec::new());
            }
        }

        let Some(sources) = self.sources.as_ref() else {
            return TaskReport::success(Vec::new());
        };

        match execute(sources, &self.stages, self.destination(ctx.mode()), ctx, task).await {
            Ok(run) => {
                if self.report {
                    info!(task = %task, files = run.files, bytes = run.bytes, "build size");
                } else {
                    debug!(task = %task, files = run.written.len(), bytes = run.bytes, "pipeline wrote output");
                }
                if run.errors.is_empty() {
                    TaskReport::success(run.written)
                } else {
                    warn!(task = %task, errors = run.errors.len(), written = run.written.len(), "pipeline finished with transform errors");
                    TaskReport::failed(TaskFailure::Transform(run.errors), run.written)
                }
            }
            Err(PipelineError::Transform(errors)) => {
                TaskReport::failed(TaskFailure::Transform(errors), Vec::new())
            }
            Err(PipelineError::Io(err)) => {
                TaskReport::failed(TaskFailure::Fatal(format!("{err:#}")), Vec::new())
            }
        }
    }
}

impl TaskWork for PipelineWork {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a BuildContext) -> WorkFuture<'a> {
        Box::pin(self.run_inner(task, ctx))
    }
}
