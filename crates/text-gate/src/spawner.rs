//! Spawning configurations as observable processes

use crate::channel::{OutputChannel, ProcessLog};
use crate::environment::ExecutionEnvironment;
use async_trait::async_trait;
use process_launcher::{EventStream, Launcher, ProcessHandle};
use std::sync::Arc;
use tracing::info;

/// Variable carrying the executor id into launched processes
pub const EXECUTOR_VAR: &str = "LAUNCH_GATE_EXECUTOR";
/// Variable carrying the execution target id into launched processes
pub const TARGET_VAR: &str = "LAUNCH_GATE_TARGET";
/// Variable carrying the execution id into launched processes
pub const EXECUTION_ID_VAR: &str = "LAUNCH_GATE_EXECUTION_ID";
/// User data keys with this prefix are exported as environment variables
pub const ENV_USER_DATA_PREFIX: &str = "env.";

/// A started process, not yet observed
///
/// Nothing is read from `events` until it is pumped into `channel`, so
/// subscribers attached before pumping see every event.
pub struct LaunchedProcess {
    /// Broadcast point for the process's output
    pub channel: OutputChannel,
    /// Raw events from the launch mechanism
    pub events: EventStream,
    /// Control handle
    pub handle: Box<dyn ProcessHandle>,
}

/// Starts the process for an execution environment
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Start the environment's configuration
    async fn spawn(&self, environment: &ExecutionEnvironment) -> process_launcher::Result<LaunchedProcess>;
}

/// Supplies the output log a launched process writes into
pub trait ProcessLogFactory: Send + Sync {
    /// Log for one launch
    fn create(&self, environment: &ExecutionEnvironment) -> Arc<dyn ProcessLog>;
}

/// Spawner backed by a [`Launcher`]
pub struct LocalSpawner<L: Launcher> {
    launcher: L,
    logs: Option<Arc<dyn ProcessLogFactory>>,
}

impl<L: Launcher> LocalSpawner<L> {
    /// Spawner without process logs
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            logs: None,
        }
    }

    /// Mirror every launched process's output into a log
    pub fn with_logs(mut self, logs: Arc<dyn ProcessLogFactory>) -> Self {
        self.logs = Some(logs);
        self
    }
}

/// The command line for an environment, with launch context exported
pub fn command_for(environment: &ExecutionEnvironment) -> process_launcher::CommandLine {
    let mut command = environment
        .configuration
        .command
        .clone()
        .env(EXECUTOR_VAR, environment.executor.id())
        .env(EXECUTION_ID_VAR, environment.execution_id.to_string());
    if let Some(target) = &environment.target {
        command = command.env(TARGET_VAR, target.id.clone());
    }
    for (key, value) in &environment.user_data {
        if let Some(name) = key.strip_prefix(ENV_USER_DATA_PREFIX) {
            command = command.env(name, value.clone());
        }
    }
    command
}

#[async_trait]
impl<L: Launcher> ProcessSpawner for LocalSpawner<L> {
    async fn spawn(&self, environment: &ExecutionEnvironment) -> process_launcher::Result<LaunchedProcess> {
        let command = command_for(environment);
        let (events, handle) = self.launcher.launch(&command).await?;
        info!(
            configuration = %environment.configuration,
            executor = %environment.executor,
            pid = ?handle.pid(),
            "launched"
        );

        let name = environment.configuration.name.clone();
        let channel = match &self.logs {
            Some(logs) => OutputChannel::with_log(name, logs.create(environment)),
            None => OutputChannel::new(name),
        };
        Ok(LaunchedProcess {
            channel,
            events,
            handle: Box::new(handle),
        })
    }
}
