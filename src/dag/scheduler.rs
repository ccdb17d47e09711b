// src/dag/scheduler.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::ConfigurationError;
use crate::registry::TaskRegistry;

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - resolving requested tasks to their prerequisite closure
/// - deciding when a task is ready (all prerequisites succeeded this run)
/// - marking tasks as succeeded/failed/skipped
/// - aborting the rest of a run on failure when `abort_on_failure` is set
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Skip every pending task as soon as one task fails.
    abort_on_failure: bool,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    /// Tasks of the current run in execution order.
    run_order: Vec<TaskName>,
    /// `sequence` constraints of the current run: task -> tasks it waits for.
    gates: HashMap<TaskName, BTreeSet<TaskName>>,
}

impl Scheduler {
    pub fn new(registry: &TaskRegistry, abort_on_failure: bool) -> Self {
        let graph = TaskGraph::from_registry(registry);
        let tasks = registry
            .iter()
            .map(|def| (def.name.clone(), TaskInfo::from_def(def)))
            .collect();

        Self {
            graph,
            tasks,
            abort_on_failure,
            run_counter: 0,
            current_run_id: None,
            run_order: Vec::new(),
            gates: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state. `None` for unknown tasks.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the active run, in execution order.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }
        self.run_order.clone()
    }

    /// Execution order for `target` without starting anything.
    pub fn plan(&self, target: &str) -> Result<Vec<TaskName>, ConfigurationError> {
        self.graph.execution_order(target)
    }

    /// Start a run for `targets` and their prerequisites.
    ///
    /// Every target is resolved before any state changes, so an unknown
    /// name or a cycle leaves the scheduler untouched and runs nothing.
    /// Called while a run is active, the new tasks join that run; tasks
    /// already in it are not scheduled again.
    pub fn start_run(&mut self, targets: &[TaskName]) -> Result<SchedulerStep, ConfigurationError> {
        let order = self.graph.execution_order_for(targets)?;
        if order.is_empty() {
            return Ok(SchedulerStep::default());
        }

        let active = self.current_run_id.is_some();
        let mut gates = if active {
            self.gates.clone()
        } else {
            HashMap::new()
        };
        for (task, waits_for) in self.graph.sequence_gates(&order)? {
            gates.entry(task).or_default().extend(waits_for);
        }
        let mut members = if active {
            self.run_order.clone()
        } else {
            Vec::new()
        };
        for name in order.iter() {
            if !members.contains(name) {
                members.push(name.clone());
            }
        }
        ensure_orderable(&self.graph, &members, &gates)?;
        self.gates = gates;

        if !active {
            self.run_counter += 1;
            self.current_run_id = Some(self.run_counter);
            self.run_order.clear();
            for info in self.tasks.values_mut() {
                info.run_state = None;
            }
            info!(run_id = self.run_counter, ?targets, ?order, "starting run");
        } else {
            debug!(run_id = self.current_run_id, ?targets, "merging targets into active run");
        }

        for name in order.iter() {
            if !self.run_order.contains(name) {
                self.run_order.push(name.clone());
            }
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.gates, self.current_run_id);
        manager.mark_pending(&order);
        let newly_scheduled = manager.collect_new_ready_tasks(&self.run_order);
        let run_just_finished = self.maybe_finish_run();

        Ok(SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        })
    }

    /// Record that `task` finished with `outcome` and release (or skip) its
    /// dependents.
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if info.run_state != Some(RunState::Running) {
            warn!(task = %task, state = ?info.run_state, "completion for task that is not running; ignoring");
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_successful_run = Some(run_id);
                debug!(task = %task, run_id, "task completed successfully");

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.gates, self.current_run_id);
                step.newly_scheduled = manager.collect_new_ready_tasks(&self.run_order);
            }
            TaskOutcome::Failed(failure) => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_failed_run = Some(run_id);
                warn!(task = %task, run_id, fatal = failure.is_fatal(), "task failed; skipping dependents in this run");
                step.newly_failed.push(task.to_string());

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.gates, self.current_run_id);
                step.newly_skipped = manager.mark_dependents_skipped(task);
                if self.abort_on_failure || failure.is_fatal() {
                    step.newly_skipped.extend(manager.skip_all_pending(&self.run_order));
                }
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Clear `current_run_id` if every task of the run is terminal.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, &self.gates, self.current_run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "all tasks terminal; run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }
}

/// Fail if `after` edges and `sequence` gates together leave some task of
/// `members` waiting on itself.
fn ensure_orderable(
    graph: &TaskGraph,
    members: &[TaskName],
    gates: &HashMap<TaskName, BTreeSet<TaskName>>,
) -> Result<(), ConfigurationError> {
    let in_run: HashSet<&str> = members.iter().map(String::as_str).collect();
    let mut waiting: HashMap<&str, usize> = HashMap::new();
    let mut released_by: HashMap<&str, Vec<&str>> = HashMap::new();

    for name in members {
        let before: BTreeSet<&str> = graph
            .dependencies_of(name)
            .iter()
            .chain(gates.get(name).into_iter().flatten())
            .map(String::as_str)
            .filter(|dep| in_run.contains(dep))
            .collect();
        waiting.insert(name.as_str(), before.len());
        for dep in before {
            released_by.entry(dep).or_default().push(name.as_str());
        }
    }

    let mut ready: Vec<&str> = waiting
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut ordered = 0;
    while let Some(name) = ready.pop() {
        ordered += 1;
        for next in released_by.get(name).into_iter().flatten() {
            if let Some(count) = waiting.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    ready.push(*next);
                }
            }
        }
    }

    if ordered == members.len() {
        return Ok(());
    }

    let mut stuck: Vec<TaskName> = waiting
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, _)| name.to_string())
        .collect();
    stuck.sort();
    warn!(?stuck, "sequence constraints form a cycle");
    Err(ConfigurationError::CyclicDependency(stuck))
}
