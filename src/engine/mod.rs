// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the dependency scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the session state machine of an interactive `serve` profile
//! - the main runtime event loop that reacts to:
//!   - file-watch triggers
//!   - reload-only change notifications
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::path::PathBuf;

use crate::errors::{ConfigurationError, TransformError};

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of one task's work for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Why a task failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// One or more stages rejected a file. Recoverable in an interactive
    /// session.
    Transform(Vec<TransformError>),
    /// The environment failed (IO, cannot spawn a tool). Always ends the
    /// invocation.
    Fatal(String),
}

impl TaskFailure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskFailure::Fatal(_))
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Transform(errors) => {
                let mut first = true;
                for err in errors {
                    if !first {
                        f.write_str("; ")?;
                    }
                    write!(f, "{err}")?;
                    first = false;
                }
                Ok(())
            }
            TaskFailure::Fatal(message) => f.write_str(message),
        }
    }
}

/// Why the runtime stopped with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// These tasks failed; in one-shot mode any failure ends here.
    Tasks(Vec<(TaskName, TaskFailure)>),
    /// A trigger named a task the graph cannot resolve.
    Config(ConfigurationError),
    /// A one-shot build was stopped while tasks were still pending.
    Interrupted,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the scheduler is idle and there are no
    /// queued triggers (one-shot targets).
    pub exit_when_idle: bool,
    /// Interactive session: transform failures are reported but do not end
    /// the runtime, and reload listeners are notified after each run.
    pub interactive: bool,
}

impl RuntimeOptions {
    pub fn one_shot() -> Self {
        Self {
            exit_when_idle: true,
            interactive: false,
        }
    }

    pub fn interactive() -> Self {
        Self {
            exit_when_idle: false,
            interactive: true,
        }
    }
}

/// Events flowing into the runtime from watchers, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// These tasks should be run (together, in one run if idle).
    TaskTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    /// A task's work finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
        /// Output files written by the task, relative to the project root.
        written: Vec<PathBuf>,
    },
    /// A change matched a reload-only binding.
    ReloadRequested { paths: Vec<PathBuf> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;
pub mod session;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
pub use session::SessionState;
pub use crate::types::TriggerWhileRunningBehaviour;
