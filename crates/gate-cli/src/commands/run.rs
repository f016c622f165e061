//! `launch-gate run`

use crate::console::{ConsoleLogFactory, ConsoleNotifier, default_hooks};
use crate::signals;
use crate::supervisor::{Supervisor, wait_for_end};
use anyhow::{Context, Result, anyhow, bail};
use futures::future;
use gate_config::{Resolution, ResolutionContext, Workspace, build_workspace, parser};
use process_launcher::{LocalLauncher, ProcessHandle};
use std::path::Path;
use std::sync::Arc;
use text_gate::{
    BeforeLaunchPipeline, CancellationToken, Collaborators, Dispatcher, ExecutionEnvironment,
    ExecutionTarget, Executor, ExecutorRunner, LaunchOrchestrator, LaunchedProcess, LocalSpawner,
    ProcessSpawner, ProgramRunner, TargetManager,
};
use tracing::{info, warn};

/// Options for one `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Configuration to start
    pub name: String,
    /// Executor, instead of the configured default
    pub executor: Option<String>,
    /// Execution target id, instead of the first ready one
    pub target: Option<String>,
    /// Leave prerequisites running when the main process exits
    pub keep_running: bool,
}

/// Exit code reported when the before-launch tasks fail
pub const GATE_FAILED_EXIT: i32 = 2;

/// Exit code reported when the run is interrupted by SIGINT or SIGTERM
pub const INTERRUPTED_EXIT: i32 = 130;

/// Run a configuration's before-launch tasks, then the configuration
///
/// Returns the main process's exit code. Every process the run started is
/// stopped before returning, unless `keep_running` asks to wait for them.
pub fn run(config_path: &Path, options: RunOptions) -> Result<i32> {
    let config = parser::parse_file(config_path).context("Failed to parse configuration")?;
    let workspace = build_workspace(&config, &ResolutionContext::new(), Resolution::Strict)
        .context("Failed to resolve configuration")?;
    let mut environment = main_environment(&workspace, &options)?;

    let cancel = CancellationToken::new();
    let _interrupts = signals::cancel_on_interrupt(cancel.clone())?;

    let dispatcher = Arc::new(Dispatcher::start("launch-gate-events")?);
    let spawner = LocalSpawner::new(LocalLauncher).with_logs(Arc::new(ConsoleLogFactory));
    let supervisor = Arc::new(Supervisor::new(Arc::new(spawner)));
    let collaborators = Collaborators {
        registry: workspace.registry.clone(),
        targets: workspace.targets.clone(),
        runner: Arc::new(ExecutorRunner),
        hooks: default_hooks(),
        spawner: supervisor.clone(),
        notifier: Arc::new(ConsoleNotifier),
    };
    let orchestrator = LaunchOrchestrator::new(collaborators.clone(), dispatcher);

    // Prerequisites inherit the user data the hooks leave here.
    for hook in &collaborators.hooks {
        hook.before_launch(&mut environment)
            .map_err(|e| anyhow!("pre-launch hook '{}' failed: {}", hook.name(), e))?;
    }

    let name = environment.configuration.name.clone();
    let code = match BeforeLaunchPipeline::new(&orchestrator).run_for(&environment, &cancel) {
        Ok(report) if report.passed => {
            smol::block_on(run_main(supervisor.as_ref(), &environment, &cancel))
        }
        Ok(report) => {
            let reason = report
                .failure
                .map_or_else(|| "unknown reason".to_string(), |f| f.to_string());
            eprintln!("✗ {} not started: {}", name, reason);
            Ok(GATE_FAILED_EXIT)
        }
        Err(e) if e.is_cancelled() => Ok(INTERRUPTED_EXIT),
        Err(e) => Err(e.into()),
    };

    let keep_running = options.keep_running && !cancel.is_cancelled();
    smol::block_on(finish(&supervisor, keep_running, &cancel));
    if cancel.is_cancelled() {
        eprintln!("✗ {} interrupted", name);
        return Ok(INTERRUPTED_EXIT);
    }
    code
}

fn main_environment(workspace: &Workspace, options: &RunOptions) -> Result<ExecutionEnvironment> {
    let configuration = workspace
        .find_by_name(&options.name)
        .ok_or_else(|| anyhow!("Configuration '{}' not found", options.name))?;

    let executor = options
        .executor
        .as_deref()
        .map_or_else(|| workspace.default_executor.clone(), Executor::new);
    if !ExecutorRunner.can_run(&executor, &configuration) {
        bail!(
            "Configuration '{}' cannot be started with executor '{}'",
            configuration.name,
            executor
        );
    }

    let target = match &options.target {
        Some(id) => Some(
            workspace
                .targets
                .find_target(&configuration, id)
                .ok_or_else(|| anyhow!("Target '{}' cannot run '{}'", id, configuration.name))?,
        ),
        None => first_ready(workspace.targets.targets_for(&configuration)),
    };

    Ok(ExecutionEnvironment::new(configuration, executor, target))
}

fn first_ready(targets: Vec<ExecutionTarget>) -> Option<ExecutionTarget> {
    targets.into_iter().find(|t| t.ready)
}

async fn run_main(
    spawner: &dyn ProcessSpawner,
    environment: &ExecutionEnvironment,
    cancel: &CancellationToken,
) -> Result<i32> {
    let LaunchedProcess {
        channel,
        events,
        mut handle,
    } = spawner
        .spawn(environment)
        .await
        .with_context(|| format!("Failed to start '{}'", environment.configuration.name))?;
    info!(
        configuration = %environment.configuration,
        pid = ?handle.pid(),
        "main process started"
    );

    // Subscribe before pumping so the exit cannot be missed
    let subscription = channel.subscribe()?;
    let interrupted = async {
        cancel.cancelled().await;
        if let Err(e) = handle.terminate().await {
            warn!(configuration = %environment.configuration, "failed to stop main process: {}", e);
        }
        // The exit the signal causes still arrives through the subscription
        future::pending().await
    };
    let ended = smol::future::or(wait_for_end(subscription), interrupted);
    let (_, ended) = future::join(channel.pump(events), ended).await;

    let code = match ended {
        Some((Some(code), _)) => code,
        Some((None, signal)) => {
            warn!(?signal, "main process was killed");
            1
        }
        None => 1,
    };
    Ok(code)
}

/// Stop, or wait for, every process the run started
///
/// Waiting gives way to stopping once `cancel` fires.
async fn finish(supervisor: &Supervisor, keep_running: bool, cancel: &CancellationToken) {
    if keep_running {
        let all_exited = smol::future::or(
            async {
                supervisor.wait_all().await;
                true
            },
            async {
                cancel.cancelled().await;
                false
            },
        )
        .await;
        if all_exited {
            return;
        }
    }
    supervisor.stop_all().await;
}
