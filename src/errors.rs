// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ConfigurationError`]: a bad task graph or config. Always fatal.
//! - [`TransformError`]: a stage failed on a file. Recoverable in an
//!   interactive session, fatal in a one-shot build.
//! - IO failures surface as [`AssetflowError::Io`] or as a fatal
//!   [`crate::engine::TaskFailure`]. Always fatal.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: TaskName, message: String },

    #[error("build interrupted before all tasks finished")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors in the shape of the task graph or the config file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("task '{task}' has unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite {
        task: TaskName,
        prerequisite: TaskName,
    },

    #[error("cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<TaskName>),

    #[error("{0}")]
    Invalid(String),
}

/// A single stage failure on a single file (or on the whole set when
/// `file` is `None`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub stage: String,
    pub file: Option<PathBuf>,
    pub message: String,
}

impl TransformError {
    pub fn new(stage: impl Into<String>, file: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            file,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(
                f,
                "stage '{}' failed on {}: {}",
                self.stage,
                file.display(),
                self.message
            ),
            None => write!(f, "stage '{}' failed: {}", self.stage, self.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetflowError>;
