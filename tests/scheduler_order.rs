// tests/scheduler_order.rs

use std::error::Error;

use assetflow::dag::{Scheduler, TaskGraph, TaskRunState};
use assetflow::engine::{TaskFailure, TaskOutcome};
use assetflow::errors::{ConfigurationError, TransformError};
use assetflow::registry::{NoopWork, TaskRegistry};
use assetflow_test_utils::RegistryBuilder;

use std::sync::Arc;

type TestResult = Result<(), Box<dyn Error>>;

/// a -> {b, c} -> d
fn diamond() -> TaskRegistry {
    RegistryBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .task("c", &["a"])
        .task("d", &["b", "c"])
        .build()
}

fn names(tasks: &[assetflow::dag::ScheduledTask]) -> Vec<String> {
    tasks.iter().map(|t| t.name.clone()).collect()
}

#[test]
fn execution_order_lists_prerequisites_first_in_declared_order() -> TestResult {
    let graph = TaskGraph::from_registry(&diamond());
    assert_eq!(graph.execution_order("d")?, vec!["a", "b", "c", "d"]);
    assert_eq!(graph.execution_order("b")?, vec!["a", "b"]);
    Ok(())
}

#[test]
fn shared_prerequisite_appears_once() -> TestResult {
    let graph = TaskGraph::from_registry(&diamond());
    let order = graph.execution_order("d")?;
    assert_eq!(order.iter().filter(|n| n.as_str() == "a").count(), 1);
    Ok(())
}

#[test]
fn execution_order_for_several_targets_has_no_repeats() -> TestResult {
    let graph = TaskGraph::from_registry(&diamond());
    let order = graph.execution_order_for(&["c".to_string(), "b".to_string()])?;
    assert_eq!(order, vec!["a", "c", "b"]);
    Ok(())
}

#[test]
fn cycle_is_reported_with_its_path() {
    let registry = RegistryBuilder::new()
        .task("a", &["b"])
        .task("b", &["a"])
        .build();
    let graph = TaskGraph::from_registry(&registry);

    match graph.execution_order("a") {
        Err(ConfigurationError::CyclicDependency(path)) => {
            assert_eq!(path, vec!["a", "b", "a"]);
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let registry = RegistryBuilder::new().task("a", &["a"]).build();
    let graph = TaskGraph::from_registry(&registry);
    assert!(matches!(
        graph.execution_order("a"),
        Err(ConfigurationError::CyclicDependency(_))
    ));
}

#[test]
fn cycle_starts_nothing() {
    let registry = RegistryBuilder::new()
        .task("ok", &[])
        .task("x", &["ok", "y"])
        .task("y", &["x"])
        .build();
    let mut scheduler = Scheduler::new(&registry, true);

    let result = scheduler.start_run(&["x".to_string()]);
    assert!(matches!(result, Err(ConfigurationError::CyclicDependency(_))));
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.current_run_id(), None);
}

#[test]
fn unknown_target_and_unknown_prerequisite() {
    let registry = RegistryBuilder::new().task("a", &["ghost"]).build();
    let graph = TaskGraph::from_registry(&registry);

    assert_eq!(
        graph.execution_order("nope"),
        Err(ConfigurationError::UnknownTask("nope".to_string()))
    );
    assert_eq!(
        graph.execution_order("a"),
        Err(ConfigurationError::UnknownPrerequisite {
            task: "a".to_string(),
            prerequisite: "ghost".to_string(),
        })
    );
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = TaskRegistry::new();
    registry
        .register("styles", vec![], Arc::new(NoopWork))
        .unwrap();
    let err = registry
        .register("styles", vec![], Arc::new(NoopWork))
        .unwrap_err();
    assert_eq!(err, ConfigurationError::DuplicateTask("styles".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn lookup_of_missing_task_is_unknown_task() {
    let registry = diamond();
    assert!(registry.lookup("a").is_ok());
    assert_eq!(
        registry.lookup("z").unwrap_err(),
        ConfigurationError::UnknownTask("z".to_string())
    );
}

#[test]
fn scheduler_releases_tasks_as_prerequisites_complete() -> TestResult {
    let mut scheduler = Scheduler::new(&diamond(), true);

    assert!(scheduler.tasks_in_current_run().is_empty());

    let step = scheduler.start_run(&["d".to_string()])?;
    assert_eq!(names(&step.newly_scheduled), vec!["a"]);
    assert_eq!(scheduler.tasks_in_current_run(), vec!["a", "b", "c", "d"]);

    let step = scheduler.handle_completion("a", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["b", "c"]);

    let step = scheduler.handle_completion("b", &TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());

    let step = scheduler.handle_completion("c", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["d"]);
    assert!(!step.run_just_finished);

    let step = scheduler.handle_completion("d", &TaskOutcome::Success);
    assert!(step.run_just_finished);
    assert!(scheduler.is_idle());
    Ok(())
}

#[test]
fn fail_fast_skips_everything_pending() -> TestResult {
    let mut scheduler = Scheduler::new(&diamond(), true);
    scheduler.start_run(&["d".to_string()])?;
    scheduler.handle_completion("a", &TaskOutcome::Success);

    let failure = TaskFailure::Transform(vec![TransformError::new("lint", None, "bad")]);
    let step = scheduler.handle_completion("b", &TaskOutcome::Failed(failure));
    assert_eq!(step.newly_failed, vec!["b"]);
    assert!(step.newly_skipped.contains(&"d".to_string()));
    assert!(!step.run_just_finished, "c is still running");

    let step = scheduler.handle_completion("c", &TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert_eq!(scheduler.run_state_of("d"), Some(TaskRunState::Skipped));
    Ok(())
}

#[test]
fn without_abort_only_dependents_are_skipped() -> TestResult {
    let registry = RegistryBuilder::new()
        .task("styles", &[])
        .task("scripts", &[])
        .task("inject", &["styles"])
        .task("all", &["inject", "scripts"])
        .build();
    let mut scheduler = Scheduler::new(&registry, false);

    let step = scheduler.start_run(&["all".to_string()])?;
    assert_eq!(names(&step.newly_scheduled), vec!["styles", "scripts"]);

    let failure = TaskFailure::Transform(vec![TransformError::new("sass", None, "syntax")]);
    let step = scheduler.handle_completion("styles", &TaskOutcome::Failed(failure));
    assert_eq!(step.newly_skipped, vec!["inject", "all"]);

    let step = scheduler.handle_completion("scripts", &TaskOutcome::Success);
    assert!(step.run_just_finished);
    assert_eq!(scheduler.run_state_of("scripts"), Some(TaskRunState::DoneSuccess));
    Ok(())
}

#[test]
fn fatal_failure_aborts_even_without_fail_fast() -> TestResult {
    let registry = RegistryBuilder::new()
        .task("a", &[])
        .task("b", &[])
        .task("c", &["b"])
        .task("all", &["a", "c"])
        .build();
    let mut scheduler = Scheduler::new(&registry, false);
    scheduler.start_run(&["all".to_string()])?;

    let step = scheduler.handle_completion(
        "a",
        &TaskOutcome::Failed(TaskFailure::Fatal("disk full".to_string())),
    );
    assert!(step.newly_skipped.contains(&"c".to_string()));
    assert!(step.newly_skipped.contains(&"all".to_string()));
    Ok(())
}

#[test]
fn plan_does_not_start_a_run() -> TestResult {
    let scheduler = Scheduler::new(&diamond(), true);
    assert_eq!(scheduler.plan("c")?, vec!["a", "c"]);
    assert!(scheduler.is_idle());
    Ok(())
}

/// `default` runs `clean`, then `build` with its prerequisites, then
/// `modernizr`.
fn sequenced_release() -> TaskRegistry {
    RegistryBuilder::new()
        .task("clean", &[])
        .task("lint", &[])
        .task("styles", &[])
        .task("scripts", &["lint"])
        .task("html", &["styles", "scripts"])
        .task("build", &["lint", "html"])
        .task("modernizr", &[])
        .sequence("default", &["clean", "build", "modernizr"])
        .build()
}

#[test]
fn sequence_finishes_each_entry_before_the_next_starts() -> TestResult {
    let mut scheduler = Scheduler::new(&sequenced_release(), true);

    let step = scheduler.start_run(&["default".to_string()])?;
    assert_eq!(names(&step.newly_scheduled), vec!["clean"]);
    assert_eq!(scheduler.run_state_of("lint"), Some(TaskRunState::Pending));
    assert_eq!(scheduler.run_state_of("styles"), Some(TaskRunState::Pending));
    assert_eq!(scheduler.run_state_of("modernizr"), Some(TaskRunState::Pending));

    let step = scheduler.handle_completion("clean", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["lint", "styles"]);

    let step = scheduler.handle_completion("lint", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["scripts"]);
    scheduler.handle_completion("styles", &TaskOutcome::Success);
    let step = scheduler.handle_completion("scripts", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["html"]);
    let step = scheduler.handle_completion("html", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["build"]);

    let step = scheduler.handle_completion("build", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["modernizr"]);
    let step = scheduler.handle_completion("modernizr", &TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["default"]);
    let step = scheduler.handle_completion("default", &TaskOutcome::Success);
    assert!(step.run_just_finished);
    Ok(())
}

#[test]
fn sequence_only_orders_runs_that_include_its_task() -> TestResult {
    let mut scheduler = Scheduler::new(&sequenced_release(), true);

    let step = scheduler.start_run(&["build".to_string()])?;
    assert_eq!(names(&step.newly_scheduled), vec!["lint", "styles"]);
    assert_eq!(scheduler.run_state_of("clean"), Some(TaskRunState::NotInRun));
    Ok(())
}

#[test]
fn failed_sequence_entry_skips_everything_after_it() -> TestResult {
    let mut scheduler = Scheduler::new(&sequenced_release(), false);
    scheduler.start_run(&["default".to_string()])?;

    let failure = TaskFailure::Transform(vec![TransformError::new("del", None, "busy")]);
    let step = scheduler.handle_completion("clean", &TaskOutcome::Failed(failure));

    let mut skipped = step.newly_skipped.clone();
    skipped.sort();
    assert_eq!(
        skipped,
        vec!["build", "default", "html", "lint", "modernizr", "scripts", "styles"]
    );
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    Ok(())
}

#[test]
fn failure_inside_a_sequence_entry_skips_later_entries() -> TestResult {
    let mut scheduler = Scheduler::new(&sequenced_release(), false);
    scheduler.start_run(&["default".to_string()])?;
    scheduler.handle_completion("clean", &TaskOutcome::Success);
    scheduler.handle_completion("lint", &TaskOutcome::Success);

    let failure = TaskFailure::Transform(vec![TransformError::new("sass", None, "syntax")]);
    let step = scheduler.handle_completion("styles", &TaskOutcome::Failed(failure));
    let mut skipped = step.newly_skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["build", "default", "html", "modernizr"]);
    assert!(!step.run_just_finished, "scripts is still running");
    Ok(())
}

#[test]
fn conflicting_sequences_start_nothing() {
    let registry = RegistryBuilder::new()
        .task("a", &[])
        .task("b", &[])
        .sequence("x", &["a", "b"])
        .sequence("y", &["b", "a"])
        .build();
    let mut scheduler = Scheduler::new(&registry, true);

    let result = scheduler.start_run(&["x".to_string(), "y".to_string()]);

    assert!(matches!(result, Err(ConfigurationError::CyclicDependency(_))));
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.run_state_of("a"), Some(TaskRunState::NotInRun));
}
