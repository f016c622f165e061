//! `launch-gate list`

use anyhow::{Context, Result};
use gate_config::{Resolution, ResolutionContext, Workspace, build_workspace, parser};
use serde::Serialize;
use std::path::Path;
use text_gate::{ConfigurationRegistry, ExecutorRunner, ProgramRunner, available_configurations};

/// One configuration as listed
#[derive(Debug, Serialize)]
pub struct ConfigurationEntry {
    /// Configuration name
    pub name: String,
    /// Configuration type id
    #[serde(rename = "type")]
    pub type_id: String,
    /// Supported executors
    pub executors: Vec<String>,
    /// Whether it can be started with the run executor
    pub runnable: bool,
    /// Its before-launch tasks
    pub before_launch: Vec<TaskEntry>,
    /// Configurations its tasks could point at
    pub candidates: Vec<String>,
}

/// One before-launch task as listed
#[derive(Debug, Serialize)]
pub struct TaskEntry {
    /// Short description
    pub description: String,
    /// Match mode tag, if set
    pub condition: Option<String>,
    /// Trigger text
    pub text: String,
    /// Whether the task could run now
    pub executable: bool,
}

/// Describe every configuration in a workspace
pub fn entries(workspace: &Workspace) -> Vec<ConfigurationEntry> {
    let registry = workspace.registry.as_ref();
    let runner = ExecutorRunner;

    registry
        .all()
        .iter()
        .map(|configuration| ConfigurationEntry {
            name: configuration.name.clone(),
            type_id: configuration.type_id.clone(),
            executors: configuration
                .executors
                .iter()
                .map(|e| e.id().to_string())
                .collect(),
            runnable: runner.can_run(&text_gate::Executor::run(), configuration),
            before_launch: configuration
                .before_launch
                .iter()
                .map(|task| TaskEntry {
                    description: task.describe(registry),
                    condition: task.trigger().mode.map(|m| m.tag().to_string()),
                    text: task.trigger().text.clone(),
                    executable: task.can_execute(registry, &runner),
                })
                .collect(),
            candidates: available_configurations(registry, &runner, Some(configuration.as_ref()))
                .iter()
                .map(|c| c.name.clone())
                .collect(),
        })
        .collect()
}

/// Print the configurations in a file
pub fn run(config_path: &Path, json: bool) -> Result<()> {
    let config = parser::parse_file(config_path).context("Failed to parse configuration")?;
    let workspace = build_workspace(&config, &ResolutionContext::new(), Resolution::Lenient)
        .context("Failed to build configurations")?;
    let entries = entries(&workspace);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.runnable { "✓" } else { "✗" };
        println!(
            "{} {} ({}) [{}]",
            marker,
            entry.name,
            entry.type_id,
            entry.executors.join(", ")
        );
        for task in &entry.before_launch {
            let condition = task.condition.as_deref().unwrap_or("none");
            let marker = if task.executable { "" } else { " (cannot run)" };
            println!(
                "    before launch: {} until {} {:?}{}",
                task.description, condition, task.text, marker
            );
        }
    }
    Ok(())
}
