//! Launch orchestration
//!
//! The orchestrator resolves a task's configuration, execution target and
//! executor, runs pre-launch hooks, starts the process on the dispatcher and
//! blocks the calling thread until the gate resolves or the caller cancels.
//!
//! Every soft failure is turned into a `false` result with the reason kept in
//! the [`GateReport`]; only cancellation and hook failures escape as
//! [`Interrupted`].

use crate::cancel::CancellationToken;
use crate::channel::OutputChannel;
use crate::collaborators::{
    ConfigurationRegistry, Notification, Notifier, PreLaunchHook, ProgramRunner, TargetManager,
};
use crate::dispatch::Dispatcher;
use crate::environment::ExecutionEnvironment;
use crate::error::{Error, GateError, Interrupted};
use crate::gate::{Gate, NOTIFICATION_TITLE, Outcome};
use crate::spawner::ProcessSpawner;
use crate::target::{TargetReference, resolve_execution_target};
use crate::task::{MissingTargetPolicy, TextConditionTask};
use crate::trigger::TriggerSpec;
use futures::channel::oneshot;
use futures::future::{self, Either};
use futures::pin_mut;
use process_launcher::ProcessHandle;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message shown when the referenced configuration cannot be found
pub const NOT_FOUND_MESSAGE: &str = "Before launch configuration not found";

/// Everything the orchestrator needs from its host
#[derive(Clone)]
pub struct Collaborators {
    /// Configuration lookup
    pub registry: Arc<dyn ConfigurationRegistry>,
    /// Execution targets
    pub targets: Arc<dyn TargetManager>,
    /// Runner availability
    pub runner: Arc<dyn ProgramRunner>,
    /// Hooks run before every launch, in order
    pub hooks: Vec<Arc<dyn PreLaunchHook>>,
    /// Process launch mechanism
    pub spawner: Arc<dyn ProcessSpawner>,
    /// User notifications
    pub notifier: Arc<dyn Notifier>,
}

/// A prerequisite process that was started by the orchestrator
///
/// It keeps running after its gate resolves; the owner decides when to stop
/// it.
pub struct StartedProcess {
    /// The environment it was launched with
    pub environment: ExecutionEnvironment,
    /// Process id, if known
    pub pid: Option<u32>,
    /// Control handle
    pub handle: Box<dyn ProcessHandle>,
    /// Its output channel
    pub channel: OutputChannel,
}

impl fmt::Debug for StartedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedProcess")
            .field("configuration", &self.environment.configuration.name)
            .field("pid", &self.pid)
            .finish()
    }
}

/// Result of one task execution
#[derive(Debug)]
pub struct GateReport {
    /// Whether the launch sequence may continue
    pub passed: bool,
    /// Why the task failed or was skipped
    pub failure: Option<GateError>,
    /// The launched process, if one was started
    pub process: Option<StartedProcess>,
}

impl GateReport {
    fn failed(failure: GateError) -> Self {
        Self {
            passed: false,
            failure: Some(failure),
            process: None,
        }
    }
}

/// Resolves, launches and gates prerequisite configurations
pub struct LaunchOrchestrator {
    collaborators: Collaborators,
    dispatcher: Arc<Dispatcher>,
}

impl LaunchOrchestrator {
    /// Create an orchestrator launching on the given dispatcher
    pub fn new(collaborators: Collaborators, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            collaborators,
            dispatcher,
        }
    }

    /// Host collaborators
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Launch the referenced configuration and wait for its trigger
    ///
    /// A missing configuration fails the call. Must not be called from the
    /// dispatcher thread.
    pub fn execute(
        &self,
        requesting: &ExecutionEnvironment,
        reference: &TargetReference,
        trigger: &TriggerSpec,
        cancel: &CancellationToken,
    ) -> Result<bool, Interrupted> {
        let task = TextConditionTask::new(reference.clone(), trigger.clone());
        Ok(self.execute_task(requesting, &task, cancel)?.passed)
    }

    /// Run one before-launch task
    ///
    /// Must not be called from the dispatcher thread.
    pub fn execute_task(
        &self,
        requesting: &ExecutionEnvironment,
        task: &TextConditionTask,
        cancel: &CancellationToken,
    ) -> Result<GateReport, Interrupted> {
        if cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        let reference = task.reference();
        let c = &self.collaborators;

        let Some(configuration) = task.resolve(c.registry.as_ref()) else {
            return Ok(self.configuration_missing(reference, task.policy()));
        };

        let executor = requesting.executor_for(&configuration);
        let Some(target) = resolve_execution_target(
            c.targets.as_ref(),
            &configuration,
            reference.execution_target_id.as_deref(),
            requesting.target.as_ref(),
        ) else {
            warn!(configuration = %configuration, "no execution target available");
            return Ok(GateReport::failed(GateError::NoSuitableExecutionTarget {
                configuration: configuration.to_string(),
            }));
        };

        let mut environment = requesting.derive(configuration.clone(), executor, target);
        for hook in &c.hooks {
            debug!(hook = hook.name(), configuration = %configuration, "running pre-launch hook");
            hook.before_launch(&mut environment)
                .map_err(|source| Interrupted::Hook {
                    hook: hook.name().to_string(),
                    source,
                })?;
        }

        if !c.runner.can_run(&environment.executor, &configuration) {
            warn!(
                configuration = %configuration,
                executor = %environment.executor,
                "no runner available"
            );
            return Ok(GateReport::failed(GateError::RunnerUnavailable {
                configuration: configuration.to_string(),
                executor: environment.executor.to_string(),
            }));
        }

        self.run_gate(environment, task.trigger().clone(), cancel)
    }

    fn configuration_missing(
        &self,
        reference: &TargetReference,
        policy: MissingTargetPolicy,
    ) -> GateReport {
        let failure = GateError::ConfigurationNotFound {
            reference: reference.to_string(),
        };
        self.collaborators
            .notifier
            .notify(Notification::warning(NOTIFICATION_TITLE, NOT_FOUND_MESSAGE));

        if policy == MissingTargetPolicy::Skip && !reference.is_unset() {
            info!(reference = %reference, "skipping missing configuration");
            return GateReport {
                passed: true,
                failure: Some(failure),
                process: None,
            };
        }
        warn!(reference = %reference, "before launch configuration not found");
        GateReport::failed(failure)
    }

    /// Start the environment on the dispatcher and wait for the gate
    fn run_gate(
        &self,
        environment: ExecutionEnvironment,
        trigger: TriggerSpec,
        cancel: &CancellationToken,
    ) -> Result<GateReport, Interrupted> {
        let configuration = environment.configuration.to_string();
        let (started_tx, started_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let spawner = self.collaborators.spawner.clone();
        let notifier = self.collaborators.notifier.clone();
        let dispatch = self.dispatcher.handle();
        let launch_env = environment.clone();

        let task = self.dispatcher.spawn(async move {
            let launched = match spawner.spawn(&launch_env).await {
                Ok(launched) => launched,
                Err(e) => {
                    let _ = started_tx.send(Err(Error::from(e)));
                    return;
                }
            };

            let mut gate = Gate::new(launch_env.configuration.name.clone(), trigger);
            let subscription = match gate.subscribe(&launched.channel) {
                Ok(subscription) => subscription,
                Err(e) => {
                    let _ = started_tx.send(Err(e));
                    return;
                }
            };
            // Output only starts flowing once the gate is attached
            dispatch
                .spawn(launched.channel.clone().pump(launched.events))
                .detach();

            let _ = started_tx.send(Ok((launched.handle, launched.channel)));
            let outcome = gate.wait(subscription, notifier.as_ref()).await;
            let _ = outcome_tx.send(outcome);
        });

        let started = match wait_or_cancel(started_rx, cancel) {
            Some(started) => started,
            None => {
                futures::executor::block_on(task.cancel());
                info!(configuration = %configuration, "cancelled while launching");
                return Err(Interrupted::Cancelled);
            }
        };

        let (process_handle, channel) = match started {
            Ok(Ok(started)) => started,
            Ok(Err(e)) => {
                warn!(configuration = %configuration, error = %e, "failed to start");
                return Ok(GateReport::failed(GateError::LaunchStartFailure {
                    configuration,
                    reason: e.to_string(),
                }));
            }
            Err(oneshot::Canceled) => {
                return Ok(GateReport::failed(GateError::LaunchStartFailure {
                    configuration,
                    reason: "dispatcher stopped".to_string(),
                }));
            }
        };

        let process = StartedProcess {
            pid: process_handle.pid(),
            environment,
            handle: process_handle,
            channel,
        };

        let outcome = match wait_or_cancel(outcome_rx, cancel) {
            Some(Ok(outcome)) => outcome,
            Some(Err(oneshot::Canceled)) => Outcome::NotMatched {
                process_ended: false,
            },
            None => {
                // Drops the gate and with it the subscription; the process stays up
                futures::executor::block_on(task.cancel());
                info!(configuration = %configuration, "cancelled while waiting for trigger");
                return Err(Interrupted::Cancelled);
            }
        };

        let failure = match outcome {
            Outcome::Matched => None,
            Outcome::NotMatched { process_ended } => Some(GateError::ConditionNotMet {
                configuration,
                process_ended,
            }),
            Outcome::LaunchFailed => Some(GateError::LaunchStartFailure {
                configuration,
                reason: "process did not start".to_string(),
            }),
        };
        Ok(GateReport {
            passed: outcome.passed(),
            failure,
            process: Some(process),
        })
    }
}

/// Block until `future` resolves, or return `None` once `cancel` fires
fn wait_or_cancel<F: Future>(future: F, cancel: &CancellationToken) -> Option<F::Output> {
    futures::executor::block_on(async {
        let cancelled = cancel.cancelled();
        pin_mut!(future);
        pin_mut!(cancelled);
        match future::select(future, cancelled).await {
            Either::Left((output, _)) => Some(output),
            Either::Right(((), _)) => None,
        }
    })
}
