//! Before-launch pipeline sequencing

mod common;

use common::{Fixture, Step, requesting};
use std::sync::Arc;
use text_gate::{
    BeforeLaunchPipeline, CancellationToken, ExecutionEnvironment, Executor, GateError, MatchMode,
    TargetReference, TextConditionTask, TriggerSpec,
};

fn task(name: &str, text: &str) -> TextConditionTask {
    TextConditionTask::new(
        TargetReference::new("command", name),
        TriggerSpec::new(MatchMode::Contains, text),
    )
}

#[test]
fn test_all_tasks_pass_in_order() {
    let fixture = Fixture::new();
    for name in ["db", "cache"] {
        fixture.add(name);
        fixture.spawner.script(name, &[Step::Out("ready\n"), Step::Hang]);
    }
    let orchestrator = fixture.orchestrator();
    let pipeline = BeforeLaunchPipeline::new(&orchestrator);

    let report = pipeline
        .run(
            &requesting(Executor::run()),
            &[task("db", "ready"), task("cache", "ready")],
            &CancellationToken::new(),
        )
        .unwrap();

    assert!(report.passed);
    assert_eq!(report.completed, 2);
    let launched: Vec<_> = report
        .processes
        .iter()
        .map(|p| p.environment.configuration.name.clone())
        .collect();
    assert_eq!(launched, vec!["db", "cache"]);
}

#[test]
fn test_stops_at_first_failure() {
    let fixture = Fixture::new();
    for name in ["db", "cache", "queue"] {
        fixture.add(name);
    }
    fixture.spawner.script("db", &[Step::Out("ready\n"), Step::Hang]);
    fixture.spawner.script("cache", &[Step::Out("oops\n"), Step::Exit(3)]);
    let orchestrator = fixture.orchestrator();

    let report = BeforeLaunchPipeline::new(&orchestrator)
        .run(
            &requesting(Executor::run()),
            &[task("db", "ready"), task("cache", "ready"), task("queue", "ready")],
            &CancellationToken::new(),
        )
        .unwrap();

    assert!(!report.passed);
    assert_eq!(report.completed, 2);
    assert_eq!(report.processes.len(), 2);
    assert!(matches!(
        report.failure,
        Some(GateError::ConditionNotMet { .. })
    ));
    assert_eq!(fixture.spawner.launch_count(), 2);
}

#[test]
fn test_runs_configuration_own_tasks() {
    let fixture = Fixture::new();
    fixture.add("db");
    fixture.spawner.script("db", &[Step::Out("listening\n"), Step::Hang]);
    let app = common::config("app").with_before_launch(task("db", "listening"));
    let environment = ExecutionEnvironment::new(Arc::new(app), Executor::run(), None);
    let orchestrator = fixture.orchestrator();

    let report = BeforeLaunchPipeline::new(&orchestrator)
        .run_for(&environment, &CancellationToken::new())
        .unwrap();

    assert!(report.passed);
    assert_eq!(report.completed, 1);
    let (launched, _) = fixture.spawner.launched().pop().unwrap();
    assert_eq!(launched.execution_id, environment.execution_id);
    assert_eq!(launched.target.map(|t| t.id).as_deref(), Some("local"));
}

#[test]
fn test_no_tasks_passes() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let report = BeforeLaunchPipeline::new(&orchestrator)
        .run(&requesting(Executor::run()), &[], &CancellationToken::new())
        .unwrap();
    assert!(report.passed);
    assert_eq!(report.completed, 0);
}
