// src/exec/executor_loop.rs

//! Main executor loop that manages running tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;

/// Internal handle for a currently-running task.
struct ActiveTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own Tokio task, so independent tasks run
/// in parallel. When the returned sender is dropped (the runtime stopped),
/// every task still running is cancelled.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<BuildContext>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, ActiveTask> = HashMap::new();

        while let Some(task) = rx.recv().await {
            active.retain(|_, t| !t.handle.is_finished());
            handle_scheduled_task(task, &mut active, &runtime_tx, &ctx);
        }

        cancel_all(&mut active);
        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_scheduled_task(
    task: ScheduledTask,
    active: &mut HashMap<TaskName, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    ctx: &Arc<BuildContext>,
) {
    let name = task.name.clone();

    if active.contains_key(&name) {
        // The scheduler never dispatches a task twice in one run, and a new
        // run only starts once the previous one is idle.
        warn!(task = %name, run_id = task.run_id, "task dispatched while still running");
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let ctx = ctx.clone();
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        run_task(task, ctx, rt_tx, cancel_rx).await;
        debug!(task = %spawn_name, "task runner future finished");
    });

    active.insert(
        name,
        ActiveTask {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn cancel_all(active: &mut HashMap<TaskName, ActiveTask>) {
    for (name, task) in active.iter_mut() {
        if task.handle.is_finished() {
            continue;
        }
        if let Some(cancel) = task.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(task = %name, "task already finished while cancelling");
            } else {
                info!(task = %name, "cancelled in-flight task on shutdown");
            }
        }
    }
}
