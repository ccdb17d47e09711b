// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::mem;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::core::CoreRuntime;
use crate::engine::session::SessionState;
use crate::engine::{RunFailure, TaskName, TaskOutcome, TriggerReason};
use crate::reload::ReloadMessage;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Tell connected reload listeners that output changed.
    NotifyReload(ReloadMessage),
    /// Stop the runtime; `Some` carries the reason it failed.
    RequestExit(Option<RunFailure>),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(super) fn new(commands: Vec<CoreCommand>, keep_running: bool) -> Self {
        Self {
            commands,
            keep_running,
        }
    }
}

impl CoreRuntime {
    /// Start the startup sequence: each task runs as its own run, one after
    /// another. With nothing to run, go straight to watching (or exit).
    pub(super) fn handle_start(&mut self, tasks: Vec<TaskName>) -> CoreStep {
        self.startup = tasks.into();
        let mut commands = Vec::new();
        let keep_running = self.advance(&mut commands);
        CoreStep::new(commands, keep_running)
    }

    /// Handle a task trigger event.
    ///
    /// - Idle: start a run for these tasks plus anything already queued.
    /// - Run active: record the trigger in the queue; queued runs start
    ///   one after another once the current run finishes.
    pub(super) fn handle_task_trigger(
        &mut self,
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    ) -> CoreStep {
        let mut commands = Vec::new();

        if !self.scheduler.is_idle() || !self.startup.is_empty() {
            info!(?tasks, ?reason, "run in progress; queueing trigger");
            self.queue.record_trigger(&tasks);
            return CoreStep::new(commands, true);
        }

        let mut triggers = self.queue.drain_next();
        for task in tasks {
            if !triggers.contains(&task) {
                triggers.push(task);
            }
        }

        self.session.transition(SessionState::Triggered);
        let keep_running = self.begin_run(triggers, &mut commands);
        CoreStep::new(commands, keep_running)
    }

    /// Handle a task completion event.
    pub(super) fn handle_task_completion(
        &mut self,
        task: TaskName,
        outcome: TaskOutcome,
        written: Vec<PathBuf>,
    ) -> CoreStep {
        let mut commands = Vec::new();

        self.run_written.extend(written);

        if let TaskOutcome::Failed(failure) = &outcome {
            error!(task = %task, "task failed: {}", failure);
            self.failures.push((task.clone(), failure.clone()));
        }

        let step = self.scheduler.handle_completion(&task, &outcome);
        for skipped in step.newly_skipped.iter() {
            warn!(task = %skipped, "skipped because of an earlier failure");
        }
        if !step.newly_scheduled.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
        }

        let keep_running = if step.run_just_finished {
            self.finish_run(&mut commands)
        } else {
            true
        };

        CoreStep::new(commands, keep_running)
    }

    /// A change matched a reload-only binding.
    pub(super) fn handle_reload_request(&mut self, paths: Vec<PathBuf>) -> CoreStep {
        let mut commands = Vec::new();

        if !self.options.interactive {
            return CoreStep::new(commands, true);
        }

        if self.scheduler.is_idle() && self.startup.is_empty() {
            commands.push(CoreCommand::NotifyReload(ReloadMessage::for_paths(&paths)));
        } else {
            self.pending_reload = true;
            self.run_written.extend(paths);
        }

        CoreStep::new(commands, true)
    }

    /// Stop the runtime. A one-shot build that still has work outstanding
    /// ends as [`RunFailure::Interrupted`] so the exit code is non-zero.
    pub(super) fn handle_shutdown(&mut self) -> CoreStep {
        let unfinished = !self.scheduler.is_idle() || !self.startup.is_empty();
        let failure = if !self.options.interactive && unfinished {
            warn!(
                run_tasks = ?self.scheduler.tasks_in_current_run(),
                "shutdown requested before the build finished"
            );
            Some(RunFailure::Interrupted)
        } else {
            info!("shutdown requested");
            None
        };
        CoreStep::new(vec![CoreCommand::RequestExit(failure)], false)
    }

    /// Start a run for `targets`. Returns whether the runtime keeps going.
    fn begin_run(&mut self, targets: Vec<TaskName>, commands: &mut Vec<CoreCommand>) -> bool {
        match self.scheduler.start_run(&targets) {
            Ok(step) => {
                if !step.newly_scheduled.is_empty() {
                    commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
                }
                if self.scheduler.is_idle() {
                    // Nothing to run at all.
                    return self.advance(commands);
                }
                self.session.transition(SessionState::Running);
                true
            }
            Err(err) => {
                error!(?targets, "cannot start run: {}", err);
                commands.push(CoreCommand::RequestExit(Some(RunFailure::Config(err))));
                false
            }
        }
    }

    /// Wrap up a finished run: report failures, notify reload listeners and
    /// move on to whatever comes next.
    fn finish_run(&mut self, commands: &mut Vec<CoreCommand>) -> bool {
        let failures = mem::take(&mut self.failures);
        let written = mem::take(&mut self.run_written);
        let pending_reload = mem::take(&mut self.pending_reload);

        let fatal = failures.iter().any(|(_, failure)| failure.is_fatal());
        if fatal || (!self.options.interactive && !failures.is_empty()) {
            commands.push(CoreCommand::RequestExit(Some(RunFailure::Tasks(failures))));
            return false;
        }

        if failures.is_empty() {
            info!(written = written.len(), "run finished");
        } else {
            let failed: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
            warn!(?failed, written = written.len(), "run finished with failures; still watching");
        }

        if self.options.interactive && (pending_reload || !written.is_empty()) {
            commands.push(CoreCommand::NotifyReload(ReloadMessage::for_paths(&written)));
        }

        self.advance(commands)
    }

    /// Pick the next thing to do while the scheduler is idle.
    fn advance(&mut self, commands: &mut Vec<CoreCommand>) -> bool {
        if let Some(next) = self.startup.pop_front() {
            return self.begin_run(vec![next], commands);
        }

        if !self.queue.is_empty() {
            let triggers = self.queue.drain_next();
            info!(?triggers, "starting queued run");
            self.session.transition(SessionState::Triggered);
            return self.begin_run(triggers, commands);
        }

        if self.options.exit_when_idle {
            commands.push(CoreCommand::RequestExit(None));
            return false;
        }

        self.session.transition(SessionState::Watching);
        true
    }
}
