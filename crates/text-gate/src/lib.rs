//! Text-triggered launch gate
//!
//! Before a configuration starts, each of its before-launch tasks launches
//! another configuration and blocks until that process prints a trigger text.
//! The gate passes on the first matching output chunk and fails if the
//! process ends first, cannot be started, or cannot be resolved.

#![warn(missing_docs)]

pub mod cancel;
pub mod channel;
pub mod collaborators;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod gate;
pub mod matcher;
pub mod memory;
pub mod orchestrator;
pub mod pipeline;
pub mod spawner;
pub mod target;
pub mod task;
pub mod trigger;

pub use cancel::CancellationToken;
pub use channel::{ChannelEvent, OutputChannel, OutputChunk, ProcessLog, Subscription};
pub use collaborators::{
    ConfigurationRegistry, HookError, LogNotifier, Notification, Notifier, PreLaunchHook,
    ProgramRunner, Severity, TargetManager,
};
pub use dispatch::{DispatchHandle, Dispatcher};
pub use environment::{ExecutionEnvironment, Executor, RunConfiguration};
pub use error::{Error, GateError, Interrupted, Result};
pub use gate::{Gate, GateState, Outcome, await_condition};
pub use matcher::MatchMode;
pub use memory::{ExecutorRunner, MemoryRegistry, MemoryTargetManager};
pub use orchestrator::{Collaborators, GateReport, LaunchOrchestrator, StartedProcess};
pub use pipeline::{BeforeLaunchPipeline, PipelineReport};
pub use spawner::{LaunchedProcess, LocalSpawner, ProcessLogFactory, ProcessSpawner};
pub use target::{ExecutionTarget, TargetReference, resolve_execution_target};
pub use task::{Attributes, MissingTargetPolicy, TextConditionTask, available_configurations};
pub use trigger::TriggerSpec;
