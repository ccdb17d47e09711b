// src/config/validate.rs

use std::collections::BTreeSet;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig};
use crate::errors::ConfigurationError;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigurationError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_stages(cfg)?;
    validate_dag(cfg)?;
    validate_serve_profiles(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    if cfg.task.is_empty() {
        return Err(ConfigurationError::Invalid(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    if cfg.config.queue_length == 0 {
        return Err(ConfigurationError::Invalid(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    for (name, task) in cfg.task.iter() {
        let mut seen = BTreeSet::new();
        for entry in task.sequence.iter() {
            if !seen.insert(entry.as_str()) {
                return Err(ConfigurationError::Invalid(format!(
                    "task '{name}' lists '{entry}' twice in `sequence`"
                )));
            }
        }

        for dep in task.after.iter().chain(task.sequence.iter()) {
            if dep == name {
                return Err(ConfigurationError::CyclicDependency(vec![
                    name.clone(),
                    name.clone(),
                ]));
            }
            if !cfg.task.contains_key(dep) {
                return Err(ConfigurationError::UnknownPrerequisite {
                    task: name.clone(),
                    prerequisite: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_stages(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    for (name, task) in cfg.task.iter() {
        if !task.stages.is_empty() && task.src.is_empty() {
            return Err(ConfigurationError::Invalid(format!(
                "task '{name}' declares stages but no `src` patterns"
            )));
        }
        if task.dev_dest.is_some() && task.dest.is_none() {
            return Err(ConfigurationError::Invalid(format!(
                "task '{name}' sets `dev_dest` without `dest`"
            )));
        }
        for stage in task.stages.iter() {
            match stage {
                StageConfig::Command { cmd, .. }
                | StageConfig::Lint { cmd, .. }
                | StageConfig::Bundle { cmd, .. }
                    if cmd.trim().is_empty() =>
                {
                    return Err(ConfigurationError::Invalid(format!(
                        "task '{name}' has a stage with an empty `cmd`"
                    )));
                }
                StageConfig::Concat { output, .. } if output.trim().is_empty() => {
                    return Err(ConfigurationError::Invalid(format!(
                        "task '{name}' has a concat stage with an empty `output`"
                    )));
                }
                StageConfig::Bundle { output, .. } if output.trim().is_empty() => {
                    return Err(ConfigurationError::Invalid(format!(
                        "task '{name}' has a bundle stage with an empty `output`"
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter().chain(task.sequence.iter()) {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    if toposort(&graph, None).is_ok() {
        return Ok(());
    }

    // Name the members of the first strongly connected component that
    // actually forms a cycle.
    let cycle = tarjan_scc(&graph)
        .into_iter()
        .find(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_unstable();
            let mut names: Vec<String> = component.iter().map(|n| n.to_string()).collect();
            names.push(names[0].clone());
            names
        })
        .unwrap_or_default();

    Err(ConfigurationError::CyclicDependency(cycle))
}

fn validate_serve_profiles(cfg: &RawConfigFile) -> Result<(), ConfigurationError> {
    for (profile, serve) in cfg.serve.iter() {
        if cfg.task.contains_key(profile) {
            return Err(ConfigurationError::Invalid(format!(
                "'{profile}' is both a task and a serve profile"
            )));
        }

        for task in serve.before.iter() {
            if !cfg.task.contains_key(task) {
                return Err(ConfigurationError::Invalid(format!(
                    "serve profile '{profile}' runs unknown task '{task}' in `before`"
                )));
            }
        }

        for binding in serve.watch.iter() {
            if binding.patterns.is_empty() {
                return Err(ConfigurationError::Invalid(format!(
                    "serve profile '{profile}' has a watch binding without patterns"
                )));
            }
            for task in binding.tasks.iter() {
                if !cfg.task.contains_key(task) {
                    return Err(ConfigurationError::Invalid(format!(
                        "serve profile '{profile}' watches for unknown task '{task}'"
                    )));
                }
            }
        }
    }
    Ok(())
}
