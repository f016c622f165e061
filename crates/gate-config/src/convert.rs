//! Conversion of a parsed configuration into live `text-gate` collaborators

use crate::resolver::{Resolution, ResolutionContext, resolve_command};
use crate::{Config, ConfigurationSpec, Result};
use std::sync::Arc;
use text_gate::{
    ConfigurationRegistry, ExecutionTarget, Executor, MemoryRegistry, MemoryTargetManager,
    MissingTargetPolicy, RunConfiguration, TextConditionTask,
};
use tracing::debug;

/// Everything a launch needs from a configuration file
pub struct Workspace {
    /// Declared run configurations, in declaration order
    pub registry: Arc<MemoryRegistry>,
    /// Declared execution targets and per-configuration allow-lists
    pub targets: Arc<MemoryTargetManager>,
    /// Executor used when none is requested
    pub default_executor: Executor,
    /// Log level from the settings block
    pub log_level: Option<String>,
}

impl Workspace {
    /// Find a configuration by name, whatever its type
    pub fn find_by_name(&self, name: &str) -> Option<Arc<RunConfiguration>> {
        self.registry.all().into_iter().find(|c| c.name == name)
    }
}

/// Build the registry and target manager for a configuration
///
/// Commands are resolved against `context`. Dependent configurations get their
/// prerequisite as a leading before-launch task that skips when the
/// prerequisite is missing.
pub fn build_workspace(
    config: &Config,
    context: &ResolutionContext,
    mode: Resolution,
) -> Result<Workspace> {
    let targets = MemoryTargetManager::new(config.targets.iter().map(|t| ExecutionTarget {
        id: t.id.clone(),
        ready: t.ready,
    }));
    let registry = MemoryRegistry::new();

    for (name, spec) in &config.configurations {
        let configuration = build_configuration(name, spec, context, mode)?;
        debug!(
            configuration = %name,
            tasks = configuration.before_launch.len(),
            "registered configuration"
        );
        if let Some(ids) = &spec.targets {
            targets.allow(&spec.type_id, name, ids.iter().cloned());
        }
        registry.insert(configuration);
    }

    Ok(Workspace {
        registry: Arc::new(registry),
        targets: Arc::new(targets),
        default_executor: config
            .settings
            .executor
            .as_deref()
            .map_or_else(Executor::run, Executor::new),
        log_level: config.settings.log_level.clone(),
    })
}

fn build_configuration(
    name: &str,
    spec: &ConfigurationSpec,
    context: &ResolutionContext,
    mode: Resolution,
) -> Result<RunConfiguration> {
    let command = resolve_command(&spec.command, context, mode)?;
    let mut configuration = RunConfiguration::new(&spec.type_id, name, command);

    if let Some(executors) = &spec.executors {
        configuration = configuration.with_executors(executors.iter().map(Executor::new));
    }
    if spec.use_run_executor {
        configuration = configuration.with_run_executor();
    }
    if let Some(attributes) = &spec.depends_on {
        configuration = configuration.with_before_launch(
            TextConditionTask::from_attributes(attributes).with_policy(MissingTargetPolicy::Skip),
        );
    }
    for task in &spec.before_launch {
        configuration =
            configuration.with_before_launch(TextConditionTask::from_attributes(&task.attributes));
    }
    Ok(configuration)
}
