#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use assetflow::config::{
    ConfigFile, ConfigSection, PathsSection, RawConfigFile, ServeConfig, StageConfig, TaskConfig,
    WatchBindingConfig,
};
use assetflow::registry::{NoopWork, TaskDef, TaskRegistry, TaskWork};
use assetflow::types::Mode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                paths: PathsSection::default(),
                task: BTreeMap::new(),
                serve: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_serve(mut self, name: &str, serve: ServeConfig) -> Self {
        self.config.serve.insert(name.to_string(), serve);
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn dev_dest(mut self, dest: &str) -> Self {
        self.task.dev_dest = Some(dest.to_string());
        self
    }

    pub fn clean(mut self, dir: &str) -> Self {
        self.task.clean.push(dir.to_string());
        self
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.task.stages.push(stage);
        self
    }

    pub fn report(mut self, val: bool) -> Self {
        self.task.report = val;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ServeConfig`.
pub struct ServeConfigBuilder {
    serve: ServeConfig,
}

impl ServeConfigBuilder {
    pub fn new() -> Self {
        Self {
            serve: ServeConfig::default(),
        }
    }

    pub fn before(mut self, task: &str) -> Self {
        self.serve.before.push(task.to_string());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.serve.mode = Some(mode);
        self
    }

    pub fn base_dir(mut self, dir: &str) -> Self {
        self.serve.base_dirs.push(dir.to_string());
        self
    }

    pub fn route(mut self, prefix: &str, dir: &str) -> Self {
        self.serve.routes.insert(prefix.to_string(), dir.to_string());
        self
    }

    pub fn watch(mut self, patterns: &[&str], tasks: &[&str]) -> Self {
        self.serve.watch.push(WatchBindingConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> ServeConfig {
        self.serve
    }
}

impl Default for ServeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `TaskRegistry` registered directly, bypassing config
/// validation (so cycles and unknown prerequisites can be expressed).
pub struct RegistryBuilder {
    registry: TaskRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
        }
    }

    /// Register `name` after `deps` with no-op work.
    pub fn task(self, name: &str, deps: &[&str]) -> Self {
        self.task_with(name, deps, Arc::new(NoopWork))
    }

    pub fn task_with(mut self, name: &str, deps: &[&str], work: Arc<dyn TaskWork>) -> Self {
        self.registry
            .register(name, deps.iter().map(|d| d.to_string()).collect(), work)
            .expect("duplicate task in RegistryBuilder");
        self
    }

    /// Register `name` with no-op work, running `steps` one after another.
    pub fn sequence(mut self, name: &str, steps: &[&str]) -> Self {
        self.registry
            .insert(TaskDef {
                name: name.to_string(),
                after: Vec::new(),
                sequence: steps.iter().map(|s| s.to_string()).collect(),
                description: None,
                work: Arc::new(NoopWork),
            })
            .expect("duplicate task in RegistryBuilder");
        self
    }

    pub fn build(self) -> TaskRegistry {
        self.registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
