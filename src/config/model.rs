// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{CacheStorageMode, Mode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// port = 9000
///
/// [paths]
/// src = "src"
/// dist = "dist"
///
/// [task.styles]
/// src = ["{src}/styles/*.css"]
/// dest = "{tmp}/styles"
///
/// [[task.styles.stage]]
/// kind = "command"
/// cmd = "npx postcss"
///
/// [serve.serve]
/// before = ["styles"]
/// base_dirs = ["{tmp}", "{src}"]
///
/// [[serve.serve.watch]]
/// patterns = ["{src}/styles/**/*.css"]
/// tasks = ["styles"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Source tree layout from `[paths]`.
    #[serde(default)]
    pub paths: PathsSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Interactive serve profiles from `[serve.<name>]`.
    #[serde(default)]
    pub serve: BTreeMap<String, ServeConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can assume every `after` reference exists and the task graph
/// is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    paths: PathsSection,
    task: BTreeMap<String, TaskConfig>,
    serve: BTreeMap<String, ServeConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            task: raw.task,
            serve: raw.serve,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn serve_profiles(&self) -> &BTreeMap<String, ServeConfig> {
        &self.serve
    }

    pub fn serve_profile(&self, name: &str) -> Option<&ServeConfig> {
        self.serve.get(name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Follow-up runs kept while a run is active. Below the limit each
    /// trigger queues its own run; at the limit triggers merge into the
    /// newest queued run.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Default live-reload port for serve profiles.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where `cache = true` stages keep their outputs.
    #[serde(default)]
    pub cache_storage: CacheStorageMode,
}

fn default_queue_length() -> usize {
    1
}

fn default_port() -> u16 {
    9000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            port: default_port(),
            cache_storage: CacheStorageMode::default(),
        }
    }
}

/// `[paths]` section: the source tree layout.
///
/// Each entry can be referenced as `{src}`, `{dist}` or `{tmp}` inside
/// patterns, destinations and serve directories.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_dist")]
    pub dist: String,
    #[serde(default = "default_tmp")]
    pub tmp: String,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

fn default_tmp() -> String {
    ".tmp".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            tmp: default_tmp(),
        }
    }
}

impl PathsSection {
    /// Substitute `{src}`, `{dist}` and `{tmp}` in `value`.
    pub fn expand(&self, value: &str) -> String {
        value
            .replace("{src}", &self.src)
            .replace("{dist}", &self.dist)
            .replace("{tmp}", &self.tmp)
    }

    pub fn expand_all(&self, values: &[String]) -> Vec<String> {
        values.iter().map(|v| self.expand(v)).collect()
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Free-form description shown by `--list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Prerequisites: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Tasks run strictly one after another before this one: each entry,
    /// with its own prerequisites, starts only once the previous entry
    /// succeeded.
    #[serde(default)]
    pub sequence: Vec<String>,

    /// Directories removed before the pipeline runs.
    #[serde(default)]
    pub clean: Vec<String>,

    /// Source globs. Entries starting with `!` are exclusions.
    #[serde(default)]
    pub src: Vec<String>,

    /// Overrides the glob base stripped from matched paths.
    #[serde(default)]
    pub base: Option<String>,

    /// Destination directory.
    #[serde(default)]
    pub dest: Option<String>,

    /// Destination directory used in development mode, if different.
    #[serde(default)]
    pub dev_dest: Option<String>,

    /// Ordered transform stages (`[[task.<name>.stage]]`).
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,

    /// Log file count and size of the written output.
    #[serde(default)]
    pub report: bool,
}

/// One `[[task.<name>.stage]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StageConfig {
    /// Pipe each file through an external command.
    Command {
        cmd: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        when: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
        /// New extension for processed files (e.g. `"html"` for templates).
        #[serde(default)]
        extension: Option<String>,
        #[serde(default)]
        cache: bool,
    },
    /// Run a linter per file; non-zero exit is a transform error.
    Lint {
        cmd: String,
        #[serde(default)]
        when: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
        /// Replace the file with the linter's stdout.
        #[serde(default)]
        fix: bool,
    },
    /// Change extension and/or directory of matching files.
    Rename {
        #[serde(default)]
        extension: Option<String>,
        #[serde(default)]
        dirname: Option<String>,
        #[serde(default)]
        when: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
    },
    /// Bundle matching files into a single output file.
    Concat {
        output: String,
        #[serde(default)]
        separator: Option<String>,
        #[serde(default)]
        when: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
    },
    /// Run one command over every matching file and keep its stdout as a
    /// single `output` file.
    Bundle {
        cmd: String,
        output: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        when: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
    },
    /// Keep only files matching `patterns`.
    Filter {
        patterns: Vec<String>,
        #[serde(default)]
        only: Option<Mode>,
    },
}

/// `[serve.<name>]` section: an interactive session.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServeConfig {
    /// Tasks run one after another once the server is listening, before
    /// file watching starts.
    #[serde(default)]
    pub before: Vec<String>,

    /// Build mode for the session; defaults to development.
    #[serde(default)]
    pub mode: Option<Mode>,

    /// Directories served, first match wins.
    #[serde(default)]
    pub base_dirs: Vec<String>,

    /// URL prefix -> directory, checked before `base_dirs`.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,

    /// Overrides `[config].port`.
    #[serde(default)]
    pub port: Option<u16>,

    /// Watch bindings (`[[serve.<name>.watch]]`).
    #[serde(default)]
    pub watch: Vec<WatchBindingConfig>,
}

impl ServeConfig {
    pub fn effective_mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Development)
    }
}

/// One watch binding: file patterns -> tasks.
///
/// With no `tasks`, a matching change only notifies reload listeners.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchBindingConfig {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}
