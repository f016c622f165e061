//! Run configurations, executors and execution environments

use crate::target::ExecutionTarget;
use crate::task::TextConditionTask;
use process_launcher::CommandLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The way a configuration is launched ("run", "debug", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Executor(String);

impl Executor {
    /// Id of the default executor
    pub const RUN: &'static str = "run";
    /// Id of the debug executor
    pub const DEBUG: &'static str = "debug";

    /// Executor with an arbitrary id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The default "run" executor
    pub fn run() -> Self {
        Self::new(Self::RUN)
    }

    /// The "debug" executor
    pub fn debug() -> Self {
        Self::new(Self::DEBUG)
    }

    /// Executor id
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, launchable configuration
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Configuration type id
    pub type_id: String,
    /// Configuration name, unique per type
    pub name: String,
    /// What to start
    pub command: CommandLine,
    /// Always start under the run executor when used as a prerequisite
    pub use_run_executor: bool,
    /// Executors a runner may start this configuration with
    pub executors: Vec<Executor>,
    /// Tasks that must pass before this configuration starts
    pub before_launch: Vec<TextConditionTask>,
}

impl RunConfiguration {
    /// Create a configuration runnable with the run executor only
    pub fn new(type_id: impl Into<String>, name: impl Into<String>, command: CommandLine) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            command,
            use_run_executor: false,
            executors: vec![Executor::run()],
            before_launch: Vec::new(),
        }
    }

    /// Set the supported executors
    pub fn with_executors(mut self, executors: impl IntoIterator<Item = Executor>) -> Self {
        self.executors = executors.into_iter().collect();
        self
    }

    /// Prefer the run executor when launched as a prerequisite
    pub fn with_run_executor(mut self) -> Self {
        self.use_run_executor = true;
        self
    }

    /// Append a before-launch task
    pub fn with_before_launch(mut self, task: TextConditionTask) -> Self {
        self.before_launch.push(task);
        self
    }

    /// Whether the configuration declares support for an executor
    pub fn supports(&self, executor: &Executor) -> bool {
        self.executors.contains(executor)
    }

    /// Whether this is the configuration with the given type and name
    pub fn is(&self, type_id: &str, name: &str) -> bool {
        self.type_id == type_id && self.name == name
    }
}

impl fmt::Display for RunConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_id)
    }
}

/// Everything needed to start one configuration
#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    /// Shared by every environment started for one user action
    pub execution_id: Uuid,
    /// What is started
    pub configuration: Arc<RunConfiguration>,
    /// How it is started
    pub executor: Executor,
    /// Where it is started
    pub target: Option<ExecutionTarget>,
    /// Free-form data handed from hooks to the launch mechanism
    pub user_data: BTreeMap<String, String>,
}

impl ExecutionEnvironment {
    /// A fresh environment with a new execution id
    pub fn new(
        configuration: Arc<RunConfiguration>,
        executor: Executor,
        target: Option<ExecutionTarget>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            configuration,
            executor,
            target,
            user_data: BTreeMap::new(),
        }
    }

    /// Environment for a prerequisite of this one
    ///
    /// The execution id and user data carry over.
    pub fn derive(
        &self,
        configuration: Arc<RunConfiguration>,
        executor: Executor,
        target: ExecutionTarget,
    ) -> Self {
        Self {
            execution_id: self.execution_id,
            configuration,
            executor,
            target: Some(target),
            user_data: self.user_data.clone(),
        }
    }

    /// Executor to use for a prerequisite configuration
    ///
    /// A prerequisite that asks for the run executor gets it; otherwise it
    /// inherits this environment's executor.
    pub fn executor_for(&self, configuration: &RunConfiguration) -> Executor {
        if configuration.use_run_executor {
            Executor::run()
        } else {
            self.executor.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> Arc<RunConfiguration> {
        Arc::new(RunConfiguration::new("command", name, CommandLine::new("true")))
    }

    #[test]
    fn test_prerequisite_inherits_executor() {
        let outer = ExecutionEnvironment::new(config("app"), Executor::debug(), None);
        assert_eq!(outer.executor_for(&config("db")), Executor::debug());
    }

    #[test]
    fn test_prerequisite_can_insist_on_run_executor() {
        let outer = ExecutionEnvironment::new(config("app"), Executor::debug(), None);
        let db = RunConfiguration::new("command", "db", CommandLine::new("true")).with_run_executor();
        assert_eq!(outer.executor_for(&db), Executor::run());
    }

    #[test]
    fn test_derive_keeps_execution_id_and_user_data() {
        let mut outer = ExecutionEnvironment::new(config("app"), Executor::run(), None);
        outer.user_data.insert("profile".into(), "ci".into());

        let inner = outer.derive(config("db"), Executor::run(), ExecutionTarget::ready("local"));
        assert_eq!(inner.execution_id, outer.execution_id);
        assert_eq!(inner.user_data.get("profile").map(String::as_str), Some("ci"));
        assert_eq!(inner.configuration.name, "db");
        assert_eq!(inner.target.map(|t| t.id), Some("local".to_string()));
    }
}
