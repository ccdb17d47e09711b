// src/watch/event_handler.rs

//! Turns filesystem changes into runtime events.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::path_utils::{is_ignored, relative_str};
use crate::watch::patterns::WatchBinding;

/// What a batch of changed paths asks the runtime to do.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeRoute {
    /// Tasks to run, in binding order, without repeats.
    pub tasks: Vec<TaskName>,
    /// Changed paths that matched reload-only bindings.
    pub reload_paths: Vec<PathBuf>,
}

impl ChangeRoute {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reload_paths.is_empty()
    }
}

/// Match root-relative paths against `bindings`.
pub fn route_changes(bindings: &[WatchBinding], rel_paths: &[String]) -> ChangeRoute {
    let mut route = ChangeRoute::default();

    for rel in rel_paths {
        if is_ignored(rel) {
            continue;
        }
        for binding in bindings.iter().filter(|b| b.matches(rel)) {
            if binding.is_reload_only() {
                let path = PathBuf::from(rel);
                if !route.reload_paths.contains(&path) {
                    route.reload_paths.push(path);
                }
            } else {
                for task in binding.tasks() {
                    if !route.tasks.contains(task) {
                        route.tasks.push(task.clone());
                    }
                }
            }
        }
    }

    route
}

/// Process the paths of one filesystem event and notify the runtime.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_changes(
    root: &Path,
    paths: &[PathBuf],
    bindings: &[WatchBinding],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let rel_paths: Vec<String> = paths
        .iter()
        .filter_map(|path| {
            let rel = relative_str(root, path);
            if rel.is_none() {
                warn!("could not relativize path {:?} against root {:?}", path, root);
            }
            rel
        })
        .collect();

    let route = route_changes(bindings, &rel_paths);
    if route.is_empty() {
        return true;
    }

    debug!(?rel_paths, tasks = ?route.tasks, reload = ?route.reload_paths, "watch match");

    if !route.tasks.is_empty() {
        let event = RuntimeEvent::TaskTriggered {
            tasks: route.tasks,
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    if !route.reload_paths.is_empty() {
        let event = RuntimeEvent::ReloadRequested {
            paths: route.reload_paths,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::ReloadRequested: {err}");
            return false;
        }
    }

    true
}
