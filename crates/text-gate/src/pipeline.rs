//! Sequential before-launch pipeline

use crate::cancel::CancellationToken;
use crate::environment::ExecutionEnvironment;
use crate::error::{GateError, Interrupted};
use crate::orchestrator::{LaunchOrchestrator, StartedProcess};
use crate::task::TextConditionTask;
use tracing::{info, warn};

/// Outcome of running a configuration's before-launch tasks
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Whether every task passed
    pub passed: bool,
    /// Number of tasks that ran, including a failing one
    pub completed: usize,
    /// Why the pipeline stopped, if it did
    pub failure: Option<GateError>,
    /// Prerequisite processes that were started, in launch order
    pub processes: Vec<StartedProcess>,
}

/// Runs before-launch tasks in order, stopping at the first that fails
pub struct BeforeLaunchPipeline<'a> {
    orchestrator: &'a LaunchOrchestrator,
}

impl<'a> BeforeLaunchPipeline<'a> {
    /// Pipeline launching through the given orchestrator
    pub fn new(orchestrator: &'a LaunchOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run the environment's own before-launch tasks
    pub fn run_for(
        &self,
        environment: &ExecutionEnvironment,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, Interrupted> {
        self.run(environment, &environment.configuration.before_launch, cancel)
    }

    /// Run `tasks` on behalf of `environment`
    ///
    /// Processes started before an interruption are not returned; they keep
    /// running until their own event streams end.
    pub fn run(
        &self,
        environment: &ExecutionEnvironment,
        tasks: &[TextConditionTask],
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, Interrupted> {
        let mut report = PipelineReport {
            passed: true,
            ..PipelineReport::default()
        };

        for task in tasks {
            let result = self.orchestrator.execute_task(environment, task, cancel)?;
            report.completed += 1;
            report.processes.extend(result.process);
            if !result.passed {
                warn!(
                    configuration = %environment.configuration,
                    step = report.completed,
                    reason = ?result.failure,
                    "before launch task failed, launch aborted"
                );
                report.passed = false;
                report.failure = result.failure;
                return Ok(report);
            }
        }

        info!(
            configuration = %environment.configuration,
            tasks = report.completed,
            "before launch tasks passed"
        );
        Ok(report)
    }
}
