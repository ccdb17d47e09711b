// src/reload/mod.rs

//! Live-reload notifications.
//!
//! - [`ReloadMessage`] is what connected browsers receive after a run.
//! - [`ReloadHub`] fans messages out to every connected WebSocket.
//! - [`server`] serves the build output plus the reload endpoints.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

pub mod server;

pub use server::{start_server, ServerHandle, ServerOptions};

/// JSON message sent over the reload socket.
///
/// `{"type":"reload"}` or `{"type":"inject","paths":["dist/styles/main.css"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Reload the whole page.
    Reload,
    /// Re-fetch these stylesheets without a page reload.
    Inject { paths: Vec<String> },
}

impl ReloadMessage {
    /// `Inject` when every changed path is a stylesheet, `Reload` otherwise
    /// (including when nothing specific changed).
    pub fn for_paths(paths: &[PathBuf]) -> Self {
        if !paths.is_empty() && paths.iter().all(|p| is_stylesheet(p)) {
            let mut paths: Vec<String> = paths
                .iter()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .collect();
            paths.sort();
            paths.dedup();
            ReloadMessage::Inject { paths }
        } else {
            ReloadMessage::Reload
        }
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}

/// Broadcasts [`ReloadMessage`]s to connected listeners.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Send `message` to every listener. Returns how many received it.
    pub fn notify(&self, message: ReloadMessage) -> usize {
        match self.tx.send(message) {
            Ok(listeners) => {
                debug!(listeners, "sent reload message");
                listeners
            }
            Err(_) => {
                debug!("no reload listeners connected");
                0
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
