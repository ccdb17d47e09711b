// src/pipeline/mod.rs

//! File-set pipeline.
//!
//! - [`sources`] resolves glob patterns (with `!` exclusions) into a
//!   [`FileSet`].
//! - [`stage`] defines the [`TransformStage`] interface; [`stages`] holds
//!   the built-in implementations.
//! - [`executor`] composes stages, honours `fail_fast` and writes outputs
//!   through the per-path serialised [`writer::OutputWriter`].
//! - [`cache`] stores outputs of expensive `cache = true` stages.

pub mod cache;
pub mod executor;
pub mod fileset;
pub mod sources;
pub mod stage;
pub mod stages;
pub mod writer;

pub use executor::{execute, PipelineError, PipelineRun, PipelineWork};
pub use fileset::{FileSet, SourceFile};
pub use sources::SourceGlobs;
pub use stage::{Selector, StageOutput, TransformStage};
