//! In-memory collaborators

use crate::collaborators::{ConfigurationRegistry, ProgramRunner, TargetManager};
use crate::environment::{Executor, RunConfiguration};
use crate::target::ExecutionTarget;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory configuration registry
#[derive(Default)]
pub struct MemoryRegistry {
    configurations: RwLock<Vec<Arc<RunConfiguration>>>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration, replacing one with the same type and name
    pub fn insert(&self, configuration: RunConfiguration) -> Arc<RunConfiguration> {
        let configuration = Arc::new(configuration);
        let mut configurations = self.configurations.write().unwrap();
        match configurations
            .iter_mut()
            .find(|c| c.is(&configuration.type_id, &configuration.name))
        {
            Some(slot) => *slot = configuration.clone(),
            None => configurations.push(configuration.clone()),
        }
        configuration
    }
}

impl ConfigurationRegistry for MemoryRegistry {
    fn find(&self, type_id: &str, name: &str) -> Option<Arc<RunConfiguration>> {
        let configurations = self.configurations.read().unwrap();
        configurations.iter().find(|c| c.is(type_id, name)).cloned()
    }

    fn all(&self) -> Vec<Arc<RunConfiguration>> {
        self.configurations.read().unwrap().clone()
    }
}

/// In-memory execution target manager
///
/// Configurations without an explicit allow-list can run on every target.
#[derive(Default)]
pub struct MemoryTargetManager {
    targets: RwLock<Vec<ExecutionTarget>>,
    allowed: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl MemoryTargetManager {
    /// Create a manager with the given targets, in enumeration order
    pub fn new(targets: impl IntoIterator<Item = ExecutionTarget>) -> Self {
        Self {
            targets: RwLock::new(targets.into_iter().collect()),
            allowed: RwLock::new(HashMap::new()),
        }
    }

    /// Restrict a configuration to the listed target ids
    pub fn allow(&self, type_id: &str, name: &str, target_ids: impl IntoIterator<Item = String>) {
        self.allowed.write().unwrap().insert(
            (type_id.to_string(), name.to_string()),
            target_ids.into_iter().collect(),
        );
    }
}

impl TargetManager for MemoryTargetManager {
    fn targets_for(&self, configuration: &RunConfiguration) -> Vec<ExecutionTarget> {
        let targets = self.targets.read().unwrap();
        let allowed = self.allowed.read().unwrap();
        let key = (configuration.type_id.clone(), configuration.name.clone());
        match allowed.get(&key) {
            Some(ids) => targets
                .iter()
                .filter(|t| ids.contains(&t.id))
                .cloned()
                .collect(),
            None => targets.clone(),
        }
    }
}

/// Runner that can start any configuration with a program, under the
/// executors the configuration declares
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorRunner;

impl ProgramRunner for ExecutorRunner {
    fn can_run(&self, executor: &Executor, configuration: &RunConfiguration) -> bool {
        !configuration.command.program.is_empty() && configuration.supports(executor)
    }
}
