// src/pipeline/stages/filter.rs

use anyhow::Result;

use crate::context::BuildContext;
use crate::pipeline::fileset::FileSet;
use crate::pipeline::sources::split_patterns;
use crate::pipeline::stage::{Selector, StageFuture, StageOutput, TransformStage};
use crate::types::Mode;

/// Drop every file that does not match `patterns` (with `!` exclusions).
#[derive(Debug)]
pub struct FilterStage {
    keep: Selector,
    drop: Option<Selector>,
    only: Option<Mode>,
}

impl FilterStage {
    pub fn new(patterns: &[String], only: Option<Mode>) -> Result<Self> {
        let (include, exclude) = split_patterns(patterns);
        let drop = if exclude.is_empty() {
            None
        } else {
            Some(Selector::new(&exclude)?)
        };
        Ok(Self {
            keep: Selector::new(&include)?,
            drop,
            only,
        })
    }
}

impl TransformStage for FilterStage {
    fn name(&self) -> &str {
        "filter"
    }

    fn only(&self) -> Option<Mode> {
        self.only
    }

    fn apply<'a>(&'a self, files: FileSet, _ctx: &'a BuildContext) -> StageFuture<'a> {
        Box::pin(async move {
            let files = files
                .into_iter()
                .filter(|file| {
                    self.keep.selects(file)
                        && !self.drop.as_ref().is_some_and(|drop| drop.selects(file))
                })
                .collect();
            Ok(StageOutput::ok(files))
        })
    }
}
