// src/pipeline/stages/command.rs

use anyhow::Result;
use tracing::{debug, info};

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::cache::cache_key;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::pipeline::stages::process::{expand_placeholders, run_with_stdin, with_extension};
use crate::types::Mode;

/// Pipe every selected file through an external command.
///
/// The command reads the file on stdin and writes the new contents to
/// stdout. A non-zero exit is a [`TransformError`] for that file; the file
/// is dropped from the output set.
#[derive(Debug)]
pub struct CommandStage {
    name: String,
    cmd: String,
    selector: Selector,
    only: Option<Mode>,
    extension: Option<String>,
    cache: bool,
}

impl CommandStage {
    pub fn new(cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        Self {
            name: default_name(&cmd),
            cmd,
            selector: Selector::all(),
            only: None,
            extension: None,
            cache: false,
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

    pub fn extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    pub fn cached(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    async fn process_file(
        &self,
        file: SourceFile,
        ctx: &BuildContext,
    ) -> Result<std::result::Result<SourceFile, TransformError>> {
        let cmd = expand_placeholders(&self.cmd, &file, ctx);

        let key = self
            .cache
            .then(|| cache_key(&cmd, ctx.mode(), &file.path, &file.contents));

        let contents = match key.as_deref().map(|k| ctx.cache().get(k)).transpose()? {
            Some(Some(cached)) => {
                debug!(stage = %self.name, file = ?file.path, "using cached output");
                cached
            }
            _ => {
                let output = run_with_stdin(&cmd, &file, ctx).await?;
                if !output.success {
                    return Ok(Err(TransformError::new(
                        &self.name,
                        Some(file.path.clone()),
                        output.diagnostics(),
                    )));
                }
                if let Some(key) = key.as_deref() {
                    ctx.cache().put(key, &output.stdout)?;
                }
                output.stdout
            }
        };

        let path = match &self.extension {
            Some(ext) => with_extension(&file.path, ext),
            None => file.path.clone(),
        };

        Ok(Ok(SourceFile {
            path,
            origin: file.origin,
            contents,
        }))
    }
}

impl TransformStage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = StageOutput::default();
            let mut processed = 0usize;

            for file in files {
                let from = file.path.clone();
                if !self.selector.selects(&file) {
                    out.keep(&self.name, &from, file);
                    continue;
                }
                processed += 1;
                match self.process_file(file, ctx).await? {
                    Ok(file) => out.keep(&self.name, &from, file),
                    Err(err) => out.errors.push(err),
                }
            }

            info!(
                stage = %self.name,
                processed,
                errors = out.errors.len(),
                "command stage finished"
            );
            Ok(out)
        })
    }
}

/// Program name of a command line, skipping `npx`: `npx postcss` -> `postcss`.
fn default_name(cmd: &str) -> String {
    cmd.split_whitespace()
        .find(|word| *word != "npx")
        .unwrap_or("command")
        .to_string()
}
