// tests/scheduler_properties.rs

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use assetflow::dag::{Scheduler, TaskGraph, TaskRunState};
use assetflow::engine::{TaskFailure, TaskOutcome};
use assetflow::errors::TransformError;
use assetflow::registry::TaskRegistry;
use assetflow_test_utils::RegistryBuilder;

/// Random acyclic registry: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = (TaskRegistry, Vec<Vec<usize>>)> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut deps_by_task = Vec::with_capacity(num_tasks);
            let mut builder = RegistryBuilder::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let mut deps: Vec<usize> = Vec::new();
                if i > 0 {
                    for d in potential {
                        let d = d % i;
                        if !deps.contains(&d) {
                            deps.push(d);
                        }
                    }
                }
                let dep_names: Vec<String> = deps.iter().map(|d| format!("task_{d}")).collect();
                let dep_refs: Vec<&str> = dep_names.iter().map(String::as_str).collect();
                builder = builder.task(&format!("task_{i}"), &dep_refs);
                deps_by_task.push(deps);
            }
            (builder.build(), deps_by_task)
        })
    })
}

proptest! {
    #[test]
    fn execution_order_is_topological_and_complete(
        (registry, deps) in dag_strategy(12),
        target_idx in any::<usize>(),
    ) {
        let target = format!("task_{}", target_idx % deps.len());
        let graph = TaskGraph::from_registry(&registry);
        let order = graph.execution_order(&target).unwrap();

        // Each task once.
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());

        // Target last.
        prop_assert_eq!(order.last(), Some(&target));

        // Every prerequisite precedes its dependent, and the closure is complete.
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        for name in order.iter() {
            for dep in graph.dependencies_of(name) {
                let dep_pos = position.get(dep.as_str());
                prop_assert!(dep_pos.is_some(), "{} missing from order", dep);
                prop_assert!(dep_pos < position.get(name.as_str()));
            }
        }
    }

    #[test]
    fn simulated_run_terminates_and_runs_each_task_at_most_once(
        (registry, deps) in dag_strategy(10),
        target_idx in any::<usize>(),
        failing in proptest::collection::hash_set(0..10usize, 0..4),
        abort in any::<bool>(),
    ) {
        let target = format!("task_{}", target_idx % deps.len());
        let failing: HashSet<String> = failing.into_iter().map(|i| format!("task_{i}")).collect();
        let mut scheduler = Scheduler::new(&registry, abort);

        let step = scheduler.start_run(&[target.clone()]).unwrap();
        let mut executing: Vec<String> =
            step.scheduled_names().into_iter().map(String::from).collect();
        let mut executed: Vec<String> = Vec::new();
        let mut steps = 0;

        while !executing.is_empty() {
            let task = executing.remove(0);
            steps += 1;
            prop_assert!(steps < 1000, "simulation did not terminate");

            // Prerequisites of a dispatched task all succeeded.
            for dep in scheduler.graph().dependencies_of(&task) {
                prop_assert_eq!(scheduler.run_state_of(dep), Some(TaskRunState::DoneSuccess));
            }

            executed.push(task.clone());
            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed(TaskFailure::Transform(vec![TransformError::new(
                    "stage",
                    None,
                    "boom",
                )]))
            } else {
                TaskOutcome::Success
            };
            let step = scheduler.handle_completion(&task, &outcome);
            executing.extend(step.scheduled_names().into_iter().map(String::from));
        }

        prop_assert!(scheduler.is_idle());
        let unique: HashSet<&String> = executed.iter().collect();
        prop_assert_eq!(unique.len(), executed.len());

        if failing.is_disjoint(&executed.iter().cloned().collect()) {
            prop_assert_eq!(executed.last(), Some(&target));
        }
    }
}
