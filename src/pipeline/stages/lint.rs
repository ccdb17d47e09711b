// src/pipeline/stages/lint.rs

use tracing::{info, warn};

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::pipeline::stages::process::{expand_placeholders, run_with_stdin};
use crate::types::Mode;

/// Run a linter over every selected file.
///
/// Linted files always pass through. A non-zero exit becomes a
/// [`TransformError`] carrying the linter's diagnostics. With `fix`, a
/// successful run's stdout replaces the file contents.
#[derive(Debug)]
pub struct LintStage {
    cmd: String,
    selector: Selector,
    only: Option<Mode>,
    fix: bool,
}

impl LintStage {
    pub fn new(cmd: impl Into<String>, selector: Selector, only: Option<Mode>, fix: bool) -> Self {
        Self {
            cmd: cmd.into(),
            selector,
            only,
            fix,
        }
    }
}

impl TransformStage for LintStage {
    fn name(&self) -> &str {
        "lint"
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = StageOutput::default();
            let mut checked = 0usize;

            for file in files {
                if !self.selector.selects(&file) {
                    out.files.insert(file);
                    continue;
                }
                checked += 1;

                let cmd = expand_placeholders(&self.cmd, &file, ctx);
                let output = run_with_stdin(&cmd, &file, ctx).await?;

                if !output.success {
                    let err = TransformError::new(
                        self.name(),
                        Some(file.path.clone()),
                        output.diagnostics(),
                    );
                    warn!(file = ?file.path, "{}", err);
                    out.errors.push(err);
                    out.files.insert(file);
                } else if self.fix && !output.stdout.is_empty() {
                    out.files.insert(SourceFile {
                        contents: output.stdout,
                        ..file
                    });
                } else {
                    out.files.insert(file);
                }
            }

            info!(checked, problems = out.errors.len(), "lint finished");
            Ok(out)
        })
    }
}
