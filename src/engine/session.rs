// src/engine/session.rs

use std::fmt;

use tracing::info;

/// Lifecycle of an interactive session.
///
/// `Idle -> Watching -> Triggered -> Running -> Watching`. Startup tasks run
/// straight from `Idle` to `Running`; one-shot invocations never leave
/// `Running` until they exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Watching,
    Triggered,
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Watching => "watching",
            SessionState::Triggered => "triggered",
            SessionState::Running => "running",
        };
        f.write_str(name)
    }
}

/// Holds the current [`SessionState`] and logs every transition.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "session state changed");
            self.state = next;
        }
    }
}
