// src/registry/mod.rs

//! Task registry: named tasks, their prerequisites and their work.
//!
//! Registration only checks name uniqueness. Unknown prerequisites and
//! cycles are reported when a task is resolved (see [`crate::dag::TaskGraph`]),
//! so tasks may be registered in any order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{ConfigurationError, Result};
use crate::pipeline::PipelineWork;

pub mod work;

pub use work::{FnWork, NoopWork, TaskReport, TaskWork, WorkFuture};

/// A registered task. Immutable after registration.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub name: TaskName,
    /// Prerequisites, in declared order.
    pub after: Vec<TaskName>,
    /// Prerequisites that run one after another, in declared order.
    pub sequence: Vec<TaskName>,
    pub description: Option<String>,
    pub work: Arc<dyn TaskWork>,
}

impl TaskDef {
    /// Every direct prerequisite: `after` entries, then `sequence` entries.
    pub fn prerequisites(&self) -> Vec<TaskName> {
        let mut deps = self.after.clone();
        for name in self.sequence.iter() {
            if !deps.contains(name) {
                deps.push(name.clone());
            }
        }
        deps
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with its prerequisites and work.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        after: Vec<TaskName>,
        work: Arc<dyn TaskWork>,
    ) -> std::result::Result<(), ConfigurationError> {
        self.insert(TaskDef {
            name: name.into(),
            after,
            sequence: Vec::new(),
            description: None,
            work,
        })
    }

    /// Register a fully described task.
    pub fn insert(&mut self, def: TaskDef) -> std::result::Result<(), ConfigurationError> {
        if self.tasks.contains_key(&def.name) {
            return Err(ConfigurationError::DuplicateTask(def.name));
        }
        debug!(task = %def.name, after = ?def.after, sequence = ?def.sequence, "registered task");
        self.tasks.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> std::result::Result<&TaskDef, ConfigurationError> {
        self.tasks
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.values()
    }

    /// Build a registry from every `[task.<name>]` section.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();
        for (name, task) in cfg.tasks().iter() {
            let work: Arc<dyn TaskWork> = if task.src.is_empty() && task.clean.is_empty() {
                Arc::new(NoopWork)
            } else {
                Arc::new(PipelineWork::from_config(task, cfg.paths())?)
            };
            registry.insert(TaskDef {
                name: name.clone(),
                after: task.after.clone(),
                sequence: task.sequence.clone(),
                description: task.description.clone(),
                work,
            })?;
        }
        Ok(registry)
    }
}
