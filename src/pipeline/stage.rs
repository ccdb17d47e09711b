// src/pipeline/stage.rs

//! The uniform transform interface.
//!
//! Every stage maps one [`FileSet`] to another. Errors that concern a single
//! file (a compile error, a lint violation) are returned as
//! [`TransformError`]s inside [`StageOutput`] so the pipeline can decide,
//! based on `fail_fast`, whether to continue. An `Err` from `apply` is an
//! environment failure (cannot spawn a process, cannot read the cache) and
//! is always fatal.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::Result;
use globset::GlobSet;
use tracing::warn;

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::pipeline::sources::build_globset;
use crate::types::Mode;

/// Result of running one stage.
#[derive(Debug, Default)]
pub struct StageOutput {
    pub files: FileSet,
    pub errors: Vec<TransformError>,
}

impl StageOutput {
    pub fn ok(files: FileSet) -> Self {
        Self {
            files,
            errors: Vec::new(),
        }
    }

    /// Add `file`, which was at `from` before the stage ran. A file already
    /// at the same path is replaced and reported as a [`TransformError`]
    /// for `stage`.
    pub fn keep(&mut self, stage: &str, from: &Path, file: SourceFile) {
        let to = file.path.clone();
        let incoming = file.origin.clone().unwrap_or_else(|| from.to_path_buf());
        if let Some(previous) = self.files.insert(file) {
            let existing = previous.origin.unwrap_or(previous.path);
            warn!(stage, ?existing, ?incoming, ?to, "two files map to the same output path");
            self.errors.push(TransformError::new(
                stage,
                Some(to.clone()),
                format!(
                    "`{}` and `{}` both map to `{}`",
                    existing.display(),
                    incoming.display(),
                    to.display()
                ),
            ));
        }
    }
}

pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<StageOutput>> + Send + 'a>>;

/// A single file-set-to-file-set operation.
pub trait TransformStage: Send + Sync + fmt::Debug {
    /// Name used in logs and in [`TransformError::stage`].
    fn name(&self) -> &str;

    /// Restrict the stage to one mode. `None` runs in both.
    fn only(&self) -> Option<Mode> {
        None
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a BuildContext) -> StageFuture<'a>;
}

/// Whether `stage` runs in `mode`.
pub fn stage_enabled(stage: &dyn TransformStage, mode: Mode) -> bool {
    stage.only().is_none_or(|only| only == mode)
}

/// The `when = [...]` restriction shared by the built-in stages.
///
/// An empty selector matches every file.
#[derive(Clone, Default)]
pub struct Selector {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.patterns).finish()
    }
}

impl Selector {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let set = if patterns.is_empty() {
            None
        } else {
            Some(build_globset(patterns)?)
        };
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// Patterns without a `/` match against the file name, so
    /// `when = ["*.js"]` selects scripts in any directory.
    pub fn selects(&self, file: &SourceFile) -> bool {
        match &self.set {
            None => true,
            Some(set) => {
                let rel = file.rel_str();
                if set.is_match(&rel) {
                    return true;
                }
                file.path
                    .file_name()
                    .map(|name| set.is_match(name.to_string_lossy().as_ref()))
                    .unwrap_or(false)
            }
        }
    }
}
