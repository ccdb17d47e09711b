// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::TaskGraph;
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    gates: &'a HashMap<TaskName, BTreeSet<TaskName>>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        gates: &'a HashMap<TaskName, BTreeSet<TaskName>>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            gates,
            current_run_id,
        }
    }

    /// Mark every task in `order` that is not yet part of this run as
    /// `Pending`. Tasks already in the run keep their state, so a task is
    /// never executed twice per run.
    pub fn mark_pending(&mut self, order: &[TaskName]) {
        for name in order {
            match self.tasks.get_mut(name) {
                Some(info) if info.run_state.is_none() => {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }
                Some(_) => {}
                None => warn!(task = %name, "resolved task missing from tasks map"),
            }
        }
    }

    /// All prerequisites of `info`, and every task it is sequenced after,
    /// completed successfully in this run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let succeeded = |dep: &TaskName| {
            matches!(
                self.tasks.get(dep).and_then(|d| d.run_state),
                Some(RunState::DoneSuccess)
            )
        };
        info.deps.iter().all(succeeded)
            && self
                .gates
                .get(&info.name)
                .is_none_or(|waits_for| waits_for.iter().all(succeeded))
    }

    /// Direct dependents of `name` plus the tasks sequenced after it.
    fn downstream_of(&self, name: &str) -> Vec<TaskName> {
        let mut next = self.graph.dependents_of(name).to_vec();
        next.extend(
            self.gates
                .iter()
                .filter(|(_, waits_for)| waits_for.contains(name))
                .map(|(task, _)| task.clone()),
        );
        next
    }

    /// Mark the pending dependents of a failed task, and the tasks sequenced
    /// after it (transitively), as `Skipped`. Returns the newly skipped names.
    pub fn mark_dependents_skipped(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.downstream_of(failed_task);
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Skipped);
                    debug!(task = %info.name, upstream = %failed_task, "skipping dependent of failed task");
                    skipped.push(info.name.clone());
                    stack.extend(self.downstream_of(&name));
                }
            }
        }

        skipped
    }

    /// Mark every `Pending` task as `Skipped` (fail-fast abort).
    pub fn skip_all_pending(&mut self, order: &[TaskName]) -> Vec<TaskName> {
        let mut skipped = Vec::new();
        for name in order {
            if let Some(info) = self.tasks.get_mut(name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Skipped);
                    skipped.push(name.clone());
                }
            }
        }
        if !skipped.is_empty() {
            info!(run_id = self.current_run_id, ?skipped, "aborting run; remaining tasks skipped");
        }
        skipped
    }

    /// Collect `Pending` tasks whose prerequisites are satisfied, in `order`,
    /// mark them `Running` and return them as [`ScheduledTask`]s.
    pub fn collect_new_ready_tasks(&mut self, order: &[TaskName]) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = order
            .iter()
            .filter(|name| {
                self.tasks.get(*name).is_some_and(|info| {
                    info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
                })
            })
            .cloned()
            .collect();

        let mut ready = Vec::new();
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                if is_rerun {
                    info!(task = %info.name, run_id = self.current_run_id, "scheduling task for re-run");
                } else {
                    info!(task = %info.name, run_id = self.current_run_id, "scheduling task");
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// No task is `Pending` or `Running`.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}
