use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetflow::dag::ScheduledTask;
use assetflow::engine::{RuntimeEvent, TaskFailure, TaskOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were "run"
/// - immediately reports `TaskCompleted` for each scheduled task, failing
///   the tasks registered with [`FakeExecutor::fail`]
/// - never reports the tasks registered with [`FakeExecutor::stall`].
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failures: HashMap<String, TaskFailure>,
    written: HashMap<String, Vec<PathBuf>>,
    stalled: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failures: HashMap::new(),
            written: HashMap::new(),
            stalled: HashSet::new(),
        }
    }

    /// Report `failure` whenever `task` runs.
    pub fn fail(mut self, task: &str, failure: TaskFailure) -> Self {
        self.failures.insert(task.to_string(), failure);
        self
    }

    /// Record `task` when it runs but never report it as completed.
    pub fn stall(mut self, task: &str) -> Self {
        self.stalled.insert(task.to_string());
        self
    }

    /// Report `paths` as written whenever `task` runs.
    pub fn writes(mut self, task: &str, paths: &[&str]) -> Self {
        self.written
            .insert(task.to_string(), paths.iter().map(PathBuf::from).collect());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }
                if self.stalled.contains(&t.name) {
                    continue;
                }

                let outcome = match self.failures.get(&t.name) {
                    Some(failure) => TaskOutcome::Failed(failure.clone()),
                    None => TaskOutcome::Success,
                };
                let written = self.written.get(&t.name).cloned().unwrap_or_default();

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                    written,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
