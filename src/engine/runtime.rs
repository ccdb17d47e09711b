// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::errors::{AssetflowError, Result};
use crate::exec::ExecutorBackend;
use crate::reload::{ReloadHub, ReloadMessage};

use super::core::CoreRuntime;
use super::{CoreCommand, RunFailure, RuntimeEvent, TaskName};

/// Drives the scheduler in response to `RuntimeEvent`s, and delegates task
/// execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reload: Option<ReloadHub>,
    failure: Option<RunFailure>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload: None,
            failure: None,
        }
    }

    /// Broadcast reload messages through `hub`.
    pub fn with_reload(mut self, hub: ReloadHub) -> Self {
        self.reload = Some(hub);
        self
    }

    /// Main event loop.
    ///
    /// - Runs the `startup` tasks one after another.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes commands returned by the core.
    ///
    /// Returns an error if the core stopped because of a failure.
    pub async fn run(mut self, startup: Vec<TaskName>) -> Result<()> {
        info!(?startup, "assetflow runtime started");

        let step = self.core.start(startup);
        let mut keep_running = step.keep_running;
        for command in step.commands {
            self.execute_command(command).await?;
        }

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                keep_running = false;
            }
        }

        info!("runtime exiting");
        match self.failure {
            None => Ok(()),
            Some(failure) => Err(failure_to_error(failure)),
        }
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::NotifyReload(message) => self.notify(message),
            CoreCommand::RequestExit(failure) => {
                debug!(?failure, "core issued RequestExit command");
                self.failure = failure;
            }
        }
        Ok(())
    }

    fn notify(&self, message: ReloadMessage) {
        match &self.reload {
            Some(hub) => {
                let listeners = hub.notify(message.clone());
                info!(?message, listeners, "notified reload listeners");
            }
            None => debug!(?message, "no reload hub; dropping reload message"),
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

fn failure_to_error(failure: RunFailure) -> AssetflowError {
    match failure {
        RunFailure::Config(err) => AssetflowError::Config(err),
        RunFailure::Interrupted => AssetflowError::Interrupted,
        RunFailure::Tasks(failures) => {
            if failures.len() > 1 {
                let names: Vec<&str> = failures.iter().map(|(n, _)| n.as_str()).collect();
                warn!(tasks = ?names, "several tasks failed; reporting the first");
            }
            match failures.into_iter().next() {
                Some((task, failure)) => AssetflowError::TaskFailed {
                    task,
                    message: failure.to_string(),
                },
                None => AssetflowError::Other(anyhow::anyhow!("run failed")),
            }
        }
    }
}
