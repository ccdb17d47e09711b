// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - broadcasting reload messages
//! - handling Ctrl+C / shutdown
//!
//! The core is unit-testable without any Tokio, channels, filesystem, or
//! processes.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::dag::Scheduler;
use crate::engine::event_handlers::CoreStep;
use crate::engine::queue::TriggerQueue;
use crate::engine::session::{Session, SessionState};
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskFailure, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    pub(super) scheduler: Scheduler,
    pub(super) queue: TriggerQueue,
    pub(super) options: RuntimeOptions,
    pub(super) session: Session,
    /// Startup tasks not started yet; each gets its own run.
    pub(super) startup: VecDeque<TaskName>,
    /// Files written (or reload-only paths) during the current run.
    pub(super) run_written: Vec<PathBuf>,
    /// A reload-only change arrived while the run was active.
    pub(super) pending_reload: bool,
    /// Failures of the current run.
    pub(super) failures: Vec<(TaskName, TaskFailure)>,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            session: Session::default(),
            startup: VecDeque::new(),
            run_written: Vec::new(),
            pending_reload: false,
            failures: Vec::new(),
        }
    }

    /// Whether the scheduler is idle.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Begin the invocation by running `tasks` one after another.
    pub fn start(&mut self, tasks: Vec<TaskName>) -> CoreStep {
        self.handle_start(tasks)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { tasks, reason } => {
                self.handle_task_trigger(tasks, reason)
            }
            RuntimeEvent::TaskCompleted {
                task,
                outcome,
                written,
            } => self.handle_task_completion(task, outcome, written),
            RuntimeEvent::ReloadRequested { paths } => self.handle_reload_request(paths),
            RuntimeEvent::ShutdownRequested => self.handle_shutdown(),
        }
    }
}
