// src/pipeline/stages/concat.rs

use std::path::PathBuf;

use tracing::debug;

use crate::context::BuildContext;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::types::Mode;

/// Bundle all selected files, in path order, into one output file.
///
/// Unselected files pass through unchanged. With no selected files no
/// output is produced.
#[derive(Debug)]
pub struct ConcatStage {
    output: PathBuf,
    separator: String,
    selector: Selector,
    only: Option<Mode>,
}

impl ConcatStage {
    pub fn new(
        output: impl Into<PathBuf>,
        separator: Option<String>,
        selector: Selector,
        only: Option<Mode>,
    ) -> Self {
        Self {
            output: output.into(),
            separator: separator.unwrap_or_else(|| "\n".to_string()),
            selector,
            only,
        }
    }
}

impl TransformStage for ConcatStage {
    fn name(&self) -> &str {
        "concat"
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, _ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut rest = FileSet::new();
            let mut bundle: Vec<u8> = Vec::new();
            let mut parts = 0usize;

            for file in files {
                if !self.selector.selects(&file) {
                    rest.insert(file);
                    continue;
                }
                if parts > 0 {
                    bundle.extend_from_slice(self.separator.as_bytes());
                }
                bundle.extend_from_slice(&file.contents);
                parts += 1;
            }

            if parts > 0 {
                debug!(output = ?self.output, parts, "concatenated files");
                rest.insert(SourceFile::new(self.output.clone(), bundle));
            }
            Ok(StageOutput::ok(rest))
        })
    }
}
