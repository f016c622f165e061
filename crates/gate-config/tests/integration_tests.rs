//! Integration tests for gate-config

use gate_config::{
    ConfigError, Resolution, ResolutionContext, build_workspace, parse_file, parse_str, parser,
    resolver,
};
use std::io::Write;
use text_gate::{Attributes, MatchMode, TextConditionTask};

const FULL: &str = r#"
version: "1"
name: "shop"
description: "Backend with its database"

settings:
  log_level: info
  executor: run

targets:
  - id: local
  - id: staging
    ready: false

configurations:
  db:
    type: command
    command:
      program: sh
      args: ["-c", "echo 'database system is ready'; sleep 60"]
      env:
        PGDATA: "${PGDATA:-/tmp/pg}"
    use_run_executor: true

  backend:
    type: command
    command:
      program: "${BACKEND_BIN}"
      working_dir: "${WORKDIR:-/srv}"
    targets: [local]
    executors: [run, debug]
    before_launch:
      - kind: text-condition
        run_configuration_type: command
        run_configuration_name: db
        run_configuration_target: local
        trigger_condition: endsWith
        trigger_text: "ready"

  e2e:
    type: dependent
    command:
      program: ./e2e.sh
    depends_on:
      run_configuration_type: command
      run_configuration_name: backend
      trigger_condition: startsWith
      trigger_text: "Listening"
"#;

#[test]
fn test_parse_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();

    let config = parse_file(file.path()).unwrap();
    assert_eq!(config.name.as_deref(), Some("shop"));
    assert_eq!(config.configurations.len(), 3);
    assert_eq!(config.settings.executor.as_deref(), Some("run"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_file(dir.path().join("launch-gate.yaml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_malformed_yaml() {
    let result = parse_str("version: [unterminated");
    assert!(matches!(result, Err(ConfigError::YamlError(_))));
}

#[test]
fn test_persisted_task_attributes_survive_conversion() {
    let config = parse_str(FULL).unwrap();
    let mut context = ResolutionContext::isolated();
    context.set_env("BACKEND_BIN", "/opt/backend");
    let workspace = build_workspace(&config, &context, Resolution::Strict).unwrap();

    let backend = workspace.find_by_name("backend").unwrap();
    assert_eq!(backend.command.program, "/opt/backend");
    assert_eq!(
        backend.command.working_dir.as_deref(),
        Some(std::path::Path::new("/srv"))
    );

    let task = &backend.before_launch[0];
    let persisted: Attributes = config.configurations["backend"].before_launch[0]
        .attributes
        .clone();
    assert_eq!(task.to_attributes(), persisted);
    assert_eq!(task.trigger().mode, Some(MatchMode::EndsWith));
    assert_eq!(task.describe(workspace.registry.as_ref()), "Run db on local");

    let db = task.resolve(workspace.registry.as_ref()).unwrap();
    assert!(task.refers_to(&db));
    assert_eq!(db.command.env.get("PGDATA").map(String::as_str), Some("/tmp/pg"));
}

#[test]
fn test_available_configurations_excludes_requester() {
    let config = parse_str(FULL).unwrap();
    let workspace = build_workspace(&config, &ResolutionContext::isolated(), Resolution::Lenient)
        .unwrap();
    let backend = workspace.find_by_name("backend").unwrap();

    let names: Vec<_> = text_gate::available_configurations(
        workspace.registry.as_ref(),
        &text_gate::ExecutorRunner,
        Some(&backend),
    )
    .iter()
    .map(|c| c.name.clone())
    .collect();
    assert_eq!(names, vec!["db", "e2e"]);
}

#[test]
fn test_validate_reports_warnings_without_failing() {
    let yaml = r#"
version: "1"
configurations:
  app:
    type: command
    command: {program: app}
    before_launch:
      - kind: text-condition
        run_configuration_type: command
        run_configuration_name: db
        trigger_condition: contains
        trigger_text: ready
"#;
    let config = parse_str(yaml).unwrap();
    let warnings = parser::validate(&config).unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("unknown configuration 'db'"));
}

#[test]
fn test_missing_variables_listing() {
    let config = parse_str(FULL).unwrap();
    let missing = resolver::missing_variables(&config, &ResolutionContext::isolated());
    assert_eq!(missing, vec!["BACKEND_BIN"]);
}

#[test]
fn test_absent_condition_never_matches() {
    let yaml = r#"
version: "1"
configurations:
  db:
    type: command
    command: {program: db}
  app:
    type: command
    command: {program: app}
    before_launch:
      - kind: text-condition
        run_configuration_type: command
        run_configuration_name: db
        trigger_text: ready
"#;
    let config = parse_str(yaml).unwrap();
    let task = TextConditionTask::from_attributes(&config.configurations["app"].before_launch[0].attributes);
    assert_eq!(task.trigger().mode, None);
    assert!(!task.trigger().is_satisfied_by("ready"));
}
