// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Queue of triggers that arrive while a run is already executing.
///
/// Semantics:
/// - Each queued entry is a *batch* of task names that run together in one
///   follow-up run. Batches run one after another, oldest first.
/// - `queue_length` (max_runs) is the number of follow-up runs kept. While
///   fewer batches are queued, every trigger opens a new batch; once the
///   limit is reached, triggers merge into the newest batch.
/// - A task already waiting in any batch is not queued again, so it re-runs
///   at most once however many change events arrive.
/// - `Cancel` keeps only the latest trigger.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of follow-up runs currently queued.
    pub fn queued_runs(&self) -> usize {
        self.runs.len()
    }

    /// Number of distinct tasks currently queued.
    pub fn pending_len(&self) -> usize {
        self.runs.iter().map(BTreeSet::len).sum()
    }

    fn is_queued(&self, task: &str) -> bool {
        self.runs.iter().any(|batch| batch.contains(task))
    }

    /// Record that `tasks` were triggered while a run is in progress.
    pub fn record_trigger(&mut self, tasks: &[TaskName]) {
        if tasks.is_empty() {
            return;
        }

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let fresh: BTreeSet<TaskName> = tasks
                    .iter()
                    .filter(|task| !self.is_queued(task))
                    .cloned()
                    .collect();
                if fresh.is_empty() {
                    debug!(?tasks, "trigger already queued (queue mode)");
                    return;
                }

                if self.runs.len() < self.max_runs {
                    debug!(?fresh, batch = self.runs.len() + 1, "queued new follow-up run");
                    self.runs.push_back(fresh);
                } else if let Some(last) = self.runs.back_mut() {
                    debug!(
                        ?fresh,
                        max_runs = self.max_runs,
                        "queue_length reached; merged trigger into newest batch"
                    );
                    last.extend(fresh);
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(
                    ?tasks,
                    "resetting queued batches to the latest trigger only (cancel mode)"
                );
                self.runs.clear();
                self.runs.push_back(tasks.iter().cloned().collect());
            }
        }
    }

    /// Take the oldest queued batch as a sorted list of task names.
    pub fn drain_next(&mut self) -> Vec<TaskName> {
        let tasks: Vec<TaskName> = self
            .runs
            .pop_front()
            .map(|batch| batch.into_iter().collect())
            .unwrap_or_default();
        debug!(
            drained = tasks.len(),
            remaining_runs = self.runs.len(),
            "took next queued batch"
        );
        tasks
    }
}
