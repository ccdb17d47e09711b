// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::engine::TaskName;
use crate::errors::ConfigurationError;
use crate::registry::TaskRegistry;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct prerequisites, in declared order.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one as a prerequisite.
    dependents: Vec<TaskName>,
    /// Prerequisites that run one after another.
    sequence: Vec<TaskName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Adjacency view of a [`TaskRegistry`].
///
/// Built without any validation: prerequisites may name unknown tasks and
/// the graph may contain cycles. Both are reported by
/// [`TaskGraph::execution_order`].
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl TaskGraph {
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let mut nodes: BTreeMap<TaskName, DagNode> = registry
            .iter()
            .map(|def| {
                (
                    def.name.clone(),
                    DagNode {
                        deps: def.prerequisites(),
                        dependents: Vec::new(),
                        sequence: def.sequence.clone(),
                    },
                )
            })
            .collect();

        let edges: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| node.deps.iter().map(|dep| (dep.clone(), name.clone())))
            .collect();

        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                if !dep_node.dependents.contains(&dependent) {
                    dep_node.dependents.push(dependent);
                }
            }
        }

        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Ordered prerequisites declared with `sequence`.
    pub fn sequence_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.sequence.as_slice())
            .unwrap_or(&[])
    }

    /// Extra ordering constraints for the tasks in `order`.
    ///
    /// For every task in `order` declaring `sequence = [s1, .., sn]`, each
    /// task needed by `s_i` (itself included) that is not already needed by
    /// an earlier entry waits for `s1 .. s_(i-1)` to succeed. The result maps
    /// a gated task to the tasks it waits for.
    pub fn sequence_gates(
        &self,
        order: &[TaskName],
    ) -> Result<HashMap<TaskName, BTreeSet<TaskName>>, ConfigurationError> {
        let mut gates: HashMap<TaskName, BTreeSet<TaskName>> = HashMap::new();

        for name in order {
            let sequence = self.sequence_of(name);
            let mut earlier: HashSet<TaskName> = HashSet::new();
            for (i, entry) in sequence.iter().enumerate() {
                let closure = self.execution_order(entry)?;
                for task in closure.iter() {
                    if i > 0 && !earlier.contains(task) {
                        gates
                            .entry(task.clone())
                            .or_default()
                            .extend(sequence[..i].iter().cloned());
                    }
                }
                earlier.extend(closure);
            }
        }

        Ok(gates)
    }

    /// Linear order in which `target` and all its transitive prerequisites
    /// can run: every prerequisite precedes its dependents and each task
    /// appears once.
    ///
    /// Prerequisites are expanded depth-first in declared order, so for
    /// `d after [b, c]`, `b after [a]`, `c after [a]` the order is
    /// `a, b, c, d`.
    pub fn execution_order(&self, target: &str) -> Result<Vec<TaskName>, ConfigurationError> {
        self.execution_order_for(&[target.to_string()])
    }

    /// Union of the execution orders of several targets, without repeats.
    pub fn execution_order_for(
        &self,
        targets: &[TaskName],
    ) -> Result<Vec<TaskName>, ConfigurationError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut order = Vec::new();

        for target in targets {
            self.visit(target, None, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'g>(
        &'g self,
        name: &str,
        requested_by: Option<&str>,
        marks: &mut HashMap<&'g str, Mark>,
        stack: &mut Vec<&'g str>,
        order: &mut Vec<TaskName>,
    ) -> Result<(), ConfigurationError> {
        let Some((key, node)) = self.nodes.get_key_value(name) else {
            return Err(match requested_by {
                Some(task) => ConfigurationError::UnknownPrerequisite {
                    task: task.to_string(),
                    prerequisite: name.to_string(),
                },
                None => ConfigurationError::UnknownTask(name.to_string()),
            });
        };
        let key = key.as_str();

        match marks.get(key) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| *n == key).unwrap_or(0);
                let mut cycle: Vec<TaskName> =
                    stack[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(key.to_string());
                return Err(ConfigurationError::CyclicDependency(cycle));
            }
            None => {}
        }

        marks.insert(key, Mark::Visiting);
        stack.push(key);

        for dep in node.deps.iter() {
            self.visit(dep, Some(key), marks, stack, order)?;
        }

        stack.pop();
        marks.insert(key, Mark::Done);
        order.push(key.to_string());
        Ok(())
    }
}
