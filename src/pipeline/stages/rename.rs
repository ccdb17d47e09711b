// src/pipeline/stages/rename.rs

use std::path::PathBuf;

use crate::context::BuildContext;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::pipeline::stages::process::with_extension;
use crate::types::Mode;

/// Move selected files to another directory and/or extension.
///
/// `dirname` replaces the directory part of the relative path, so
/// `fonts/roboto/a.woff` with `dirname = "fonts"` becomes `fonts/a.woff`.
#[derive(Debug)]
pub struct RenameStage {
    extension: Option<String>,
    dirname: Option<PathBuf>,
    selector: Selector,
    only: Option<Mode>,
}

impl RenameStage {
    pub fn new(
        extension: Option<String>,
        dirname: Option<String>,
        selector: Selector,
        only: Option<Mode>,
    ) -> Self {
        Self {
            extension,
            dirname: dirname.map(PathBuf::from),
            selector,
            only,
        }
    }

    fn rename(&self, path: &std::path::Path) -> PathBuf {
        let mut renamed = match (&self.dirname, path.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => path.to_path_buf(),
        };
        if let Some(ext) = &self.extension {
            renamed = with_extension(&renamed, ext);
        }
        renamed
    }
}

impl TransformStage for RenameStage {
    fn name(&self) -> &str {
        "rename"
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, _ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = StageOutput::default();
            for file in files {
                let from = file.path.clone();
                let file = if self.selector.selects(&file) {
                    SourceFile {
                        path: self.rename(&file.path),
                        ..file
                    }
                } else {
                    file
                };
                out.keep(self.name(), &from, file);
            }
            Ok(out)
        })
    }
}
