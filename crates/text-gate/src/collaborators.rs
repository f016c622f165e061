//! Interfaces to the host environment
//!
//! The gate never reaches for global state: the configuration registry, the
//! target manager, runners, hooks and the user notifier are all injected
//! through these traits.

use crate::environment::{ExecutionEnvironment, Executor, RunConfiguration};
use crate::target::ExecutionTarget;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Error type returned by pre-launch hooks
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Lookup of run configurations by type and name
pub trait ConfigurationRegistry: Send + Sync {
    /// Find a configuration; `None` if it does not exist (yet)
    fn find(&self, type_id: &str, name: &str) -> Option<Arc<RunConfiguration>>;

    /// Every registered configuration, in registration order
    fn all(&self) -> Vec<Arc<RunConfiguration>>;
}

/// Knowledge of which execution targets exist for a configuration
pub trait TargetManager: Send + Sync {
    /// Targets able to run the configuration, in enumeration order
    fn targets_for(&self, configuration: &RunConfiguration) -> Vec<ExecutionTarget>;

    /// Whether the target can run the configuration
    fn can_run(&self, configuration: &RunConfiguration, target: &ExecutionTarget) -> bool {
        self.targets_for(configuration)
            .iter()
            .any(|t| t.id == target.id)
    }

    /// Look a target up by id, only if it is valid for the configuration
    fn find_target(&self, configuration: &RunConfiguration, id: &str) -> Option<ExecutionTarget> {
        self.targets_for(configuration)
            .into_iter()
            .find(|t| t.id == id)
    }
}

/// Decides whether a configuration can be started under an executor
pub trait ProgramRunner: Send + Sync {
    /// Whether the configuration can run under the executor
    fn can_run(&self, executor: &Executor, configuration: &RunConfiguration) -> bool;
}

/// Side-effecting step run against an environment right before it launches
pub trait PreLaunchHook: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Prepare the environment; an error aborts the whole launch sequence
    fn before_launch(&self, environment: &mut ExecutionEnvironment) -> Result<(), HookError>;
}

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational
    Info,
    /// Something the user should look at
    Warning,
    /// Something failed
    Error,
}

/// A user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short title
    pub title: String,
    /// Message body
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl Notification {
    /// A warning notification
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Fire-and-forget delivery of user notifications
pub trait Notifier: Send + Sync {
    /// Show the notification to the user
    fn notify(&self, notification: Notification);
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => info!(title = %notification.title, "{}", notification.message),
            Severity::Warning => warn!(title = %notification.title, "{}", notification.message),
            Severity::Error => error!(title = %notification.title, "{}", notification.message),
        }
    }
}
