// src/registry/work.rs

//! The unit of work attached to a task.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::context::BuildContext;
use crate::engine::{TaskFailure, TaskName, TaskOutcome};
use crate::types::Mode;

/// What a finished task reports back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub outcome: TaskOutcome,
    /// Files written, relative to the project root.
    pub written: Vec<PathBuf>,
}

impl TaskReport {
    pub fn success(written: Vec<PathBuf>) -> Self {
        Self {
            outcome: TaskOutcome::Success,
            written,
        }
    }

    pub fn failed(failure: TaskFailure, written: Vec<PathBuf>) -> Self {
        Self {
            outcome: TaskOutcome::Failed(failure),
            written,
        }
    }
}

pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = TaskReport> + Send + 'a>>;

/// Something a task does once its prerequisites have completed.
///
/// Implementations never panic on bad input; every failure is folded into
/// the returned [`TaskReport`].
pub trait TaskWork: Send + Sync + fmt::Debug {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a BuildContext) -> WorkFuture<'a>;
}

/// A task with nothing to do besides its prerequisites (`build`, `default`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWork;

impl TaskWork for NoopWork {
    fn run<'a>(&'a self, _task: &'a str, _ctx: &'a BuildContext) -> WorkFuture<'a> {
        Box::pin(async { TaskReport::success(Vec::new()) })
    }
}

/// Closure-backed work, for embedding and tests.
///
/// The closure receives the task name and the invocation's mode.
pub struct FnWork<F> {
    f: F,
}

impl<F> FnWork<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnWork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnWork")
    }
}

impl<F, Fut> TaskWork for FnWork<F>
where
    F: Fn(TaskName, Mode) -> Fut + Send + Sync,
    Fut: Future<Output = TaskReport> + Send + 'static,
{
    fn run<'a>(&'a self, task: &'a str, ctx: &'a BuildContext) -> WorkFuture<'a> {
        Box::pin((self.f)(task.to_string(), ctx.mode()))
    }
}
