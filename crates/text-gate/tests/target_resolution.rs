//! Execution target precedence

use process_launcher::CommandLine;
use text_gate::{
    ExecutionTarget, MemoryTargetManager, RunConfiguration, TargetManager,
    resolve_execution_target,
};

fn db() -> RunConfiguration {
    RunConfiguration::new("command", "db", CommandLine::new("true"))
}

fn resolve(
    manager: &MemoryTargetManager,
    explicit: Option<&str>,
    requesting: Option<&ExecutionTarget>,
) -> Option<String> {
    resolve_execution_target(manager, &db(), explicit, requesting).map(|t| t.id)
}

#[test]
fn test_explicit_then_requesting_then_first_ready() {
    let manager = MemoryTargetManager::new([
        ExecutionTarget::not_ready("a"),
        ExecutionTarget::ready("b"),
        ExecutionTarget::ready("c"),
    ]);
    let requesting = ExecutionTarget::ready("c");

    assert_eq!(resolve(&manager, Some("a"), Some(&requesting)).as_deref(), Some("a"));
    assert_eq!(resolve(&manager, None, Some(&requesting)).as_deref(), Some("c"));
    assert_eq!(resolve(&manager, None, None).as_deref(), Some("b"));
}

#[test]
fn test_invalid_explicit_target_falls_through() {
    let manager = MemoryTargetManager::new([ExecutionTarget::ready("b")]);
    assert_eq!(resolve(&manager, Some("missing"), None).as_deref(), Some("b"));
}

#[test]
fn test_requesting_target_must_be_able_to_run_configuration() {
    let manager = MemoryTargetManager::new([
        ExecutionTarget::ready("local"),
        ExecutionTarget::ready("remote"),
    ]);
    manager.allow("command", "db", ["remote".to_string()]);

    let requesting = ExecutionTarget::ready("local");
    assert!(!manager.can_run(&db(), &requesting));
    assert_eq!(resolve(&manager, None, Some(&requesting)).as_deref(), Some("remote"));
}

#[test]
fn test_first_target_when_none_ready() {
    let manager = MemoryTargetManager::new([
        ExecutionTarget::not_ready("x"),
        ExecutionTarget::not_ready("y"),
    ]);
    assert_eq!(resolve(&manager, None, None).as_deref(), Some("x"));
}

#[test]
fn test_no_targets_at_all() {
    let manager = MemoryTargetManager::new([]);
    let requesting = ExecutionTarget::ready("local");
    assert_eq!(resolve(&manager, Some("local"), Some(&requesting)), None);
}
