use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

/// Build mode for one invocation.
///
/// Resolved once before the scheduler starts and carried in
/// [`crate::context::BuildContext`]; tasks only ever read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "dev")]
    #[value(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    #[value(alias = "prod")]
    Production,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    /// Sourcemaps are emitted in development only.
    pub fn sourcemaps(self) -> bool {
        matches!(self, Mode::Development)
    }

    /// Minification (and console stripping) happens in production only.
    pub fn minify(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour when a new trigger arrives while a run is already in progress.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour). Repeated triggers for the same task are
///   coalesced into one pending re-run.
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

/// Where cached stage outputs are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Store entries under `.assetflow/cache/` (survives restarts).
    File,
    /// Store entries in memory only (lost on exit).
    #[default]
    Memory,
}
