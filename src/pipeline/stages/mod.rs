// src/pipeline/stages/mod.rs

//! Built-in transform stages.
//!
//! Heavy lifting (CSS post-processing, bundling, minification, image
//! optimisation) is delegated to external tools through [`CommandStage`],
//! or [`BundleStage`] for tools that read a whole set of files at once.
//! The remaining stages only reshape the file set.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{PathsSection, StageConfig};
use crate::pipeline::stage::{Selector, TransformStage};

pub mod bundle;
pub mod command;
pub mod concat;
pub mod filter;
pub mod lint;
pub mod process;
pub mod rename;

pub use bundle::BundleStage;
pub use command::CommandStage;
pub use concat::ConcatStage;
pub use filter::FilterStage;
pub use lint::LintStage;
pub use rename::RenameStage;

/// Compile one `[[task.<name>.stage]]` entry.
pub fn build_stage(config: &StageConfig, paths: &PathsSection) -> Result<Arc<dyn TransformStage>> {
    let stage: Arc<dyn TransformStage> = match config {
        StageConfig::Command {
            cmd,
            name,
            when,
            only,
            extension,
            cache,
        } => {
            let mut stage = CommandStage::new(paths.expand(cmd))
                .when(Selector::new(when)?)
                .only_in(*only)
                .extension(extension.clone())
                .cached(*cache);
            if let Some(name) = name {
                stage = stage.named(name.clone());
            }
            Arc::new(stage)
        }
        StageConfig::Lint {
            cmd,
            when,
            only,
            fix,
        } => Arc::new(LintStage::new(
            paths.expand(cmd),
            Selector::new(when)?,
            *only,
            *fix,
        )),
        StageConfig::Rename {
            extension,
            dirname,
            when,
            only,
        } => Arc::new(RenameStage::new(
            extension.clone(),
            dirname.clone(),
            Selector::new(when)?,
            *only,
        )),
        StageConfig::Concat {
            output,
            separator,
            when,
            only,
        } => Arc::new(ConcatStage::new(
            output.as_str(),
            separator.clone(),
            Selector::new(when)?,
            *only,
        )),
        StageConfig::Bundle {
            cmd,
            output,
            name,
            when,
            only,
        } => {
            let mut stage = BundleStage::new(paths.expand(cmd), output.as_str())
                .when(Selector::new(when)?)
                .only_in(*only);
            if let Some(name) = name {
                stage = stage.named(name.clone());
            }
            Arc::new(stage)
        }
        StageConfig::Filter { patterns, only } => Arc::new(FilterStage::new(patterns, *only)?),
    };
    Ok(stage)
}
