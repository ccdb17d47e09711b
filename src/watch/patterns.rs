// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::{PathsSection, ServeConfig, WatchBindingConfig};
use crate::engine::TaskName;
use crate::pipeline::sources::{build_globset, split_patterns};

/// Compiled watch binding: file patterns -> tasks.
///
/// Patterns are relative to the project root; entries starting with `!` are
/// exclusions. A binding without tasks is reload-only: a matching change just
/// notifies reload listeners.
#[derive(Clone)]
pub struct WatchBinding {
    patterns: Vec<String>,
    tasks: Vec<TaskName>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("patterns", &self.patterns)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(patterns: Vec<String>, tasks: Vec<TaskName>) -> Result<Self> {
        let (include, exclude) = split_patterns(&patterns);
        let watch_set = build_globset(&include)
            .with_context(|| format!("compiling watch patterns {patterns:?}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&exclude)
                    .with_context(|| format!("compiling watch exclusions {exclude:?}"))?,
            )
        };

        Ok(Self {
            patterns,
            tasks,
            watch_set,
            exclude_set,
        })
    }

    pub fn from_config(cfg: &WatchBindingConfig, paths: &PathsSection) -> Result<Self> {
        Self::new(paths.expand_all(&cfg.patterns), cfg.tasks.clone())
    }

    /// Tasks triggered by a matching change.
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn is_reload_only(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns true if this binding is interested in `rel_path` (relative to
    /// the project root, forward slashes).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        !self
            .exclude_set
            .as_ref()
            .is_some_and(|exclude| exclude.is_match(rel_path))
    }
}

/// Compile all `[[serve.<name>.watch]]` bindings of a profile.
pub fn build_bindings(profile: &ServeConfig, paths: &PathsSection) -> Result<Vec<WatchBinding>> {
    profile
        .watch
        .iter()
        .map(|binding| WatchBinding::from_config(binding, paths))
        .collect()
}
