// src/exec/task_runner.rs

//! Runs a single scheduled task's work.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;

/// Run the task's work and report a `TaskCompleted` event.
///
/// If the cancel channel fires first (shutdown), the work future is dropped,
/// which kills any child process it spawned, and **no** `TaskCompleted`
/// event is sent.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    info!(task = %task.name, run_id = task.run_id, mode = %ctx.mode(), "starting task");

    let work = task.work.run(&task.name, &ctx);

    tokio::select! {
        report = work => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                success = report.outcome.is_success(),
                written = report.written.len(),
                "task finished"
            );

            let event = RuntimeEvent::TaskCompleted {
                task: task.name.clone(),
                outcome: report.outcome,
                written: report.written,
            };
            if runtime_tx.send(event).await.is_err() {
                error!(task = %task.name, "runtime gone; dropping TaskCompleted event");
            }
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(task = %task.name, run_id = task.run_id, "task cancelled"),
                Err(_) => debug!(
                    task = %task.name,
                    run_id = task.run_id,
                    "cancel channel closed; task dropped"
                ),
            }
        }
    }
}
