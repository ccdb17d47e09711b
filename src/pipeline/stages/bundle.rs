// src/pipeline/stages/bundle.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::pipeline::stages::process::{run_in_dir, shell_quote};
use crate::types::Mode;

/// Scratch area, under the project root, where selected files are staged.
pub const BUNDLE_DIR: &str = ".assetflow/bundle";

/// Hand every selected file to one external command and replace them with
/// its stdout, written as `output`.
///
/// The files are staged under [`BUNDLE_DIR`] and the command runs there;
/// `{files}` expands to their quoted relative paths and `{mode}` to the
/// build mode. Unselected files pass through unchanged. With no selected
/// files the command does not run.
#[derive(Debug)]
pub struct BundleStage {
    name: String,
    cmd: String,
    output: PathBuf,
    selector: Selector,
    only: Option<Mode>,
}

impl BundleStage {
    pub fn new(cmd: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: "bundle".to_string(),
            cmd: cmd.into(),
            output: output.into(),
            selector: Selector::all(),
            only: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn when(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn only_in(mut self, mode: Option<Mode>) -> Self {
        self.only = mode;
        self
    }

    fn staging_dir(&self, ctx: &BuildContext) -> PathBuf {
        ctx.root().join(BUNDLE_DIR).join(&self.name)
    }

    async fn run(
        &self,
        selected: &[SourceFile],
        dir: &Path,
        ctx: &BuildContext,
    ) -> Result<std::result::Result<SourceFile, TransformError>> {
        ctx.fs().remove_dir_all(dir)?;
        for file in selected {
            ctx.fs().write(&dir.join(&file.path), &file.contents)?;
        }

        let quoted: Vec<String> = selected.iter().map(|f| shell_quote(&f.rel_str())).collect();
        let cmd = self
            .cmd
            .replace("{files}", &quoted.join(" "))
            .replace("{mode}", ctx.mode().as_str());

        let output = run_in_dir(&cmd, dir, ctx).await?;
        if !output.success {
            return Ok(Err(TransformError::new(
                &self.name,
                Some(self.output.clone()),
                output.diagnostics(),
            )));
        }
        Ok(Ok(SourceFile::new(self.output.clone(), output.stdout)))
    }
}

impl TransformStage for BundleStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = StageOutput::default();
            let mut selected = Vec::new();

            for file in files {
                if self.selector.selects(&file) {
                    selected.push(file);
                } else {
                    out.files.insert(file);
                }
            }

            if selected.is_empty() {
                debug!(stage = %self.name, "no files selected; skipping bundle");
                return Ok(out);
            }

            let dir = self.staging_dir(ctx);
            let result = self.run(&selected, &dir, ctx).await;
            if let Err(err) = ctx.fs().remove_dir_all(&dir) {
                warn!(stage = %self.name, error = %err, "could not remove bundle staging dir");
            }

            match result? {
                Ok(bundle) => {
                    info!(stage = %self.name, inputs = selected.len(), output = ?bundle.path, "bundle stage finished");
                    out.files.insert(bundle);
                }
                Err(err) => out.errors.push(err),
            }
            Ok(out)
        })
    }
}
