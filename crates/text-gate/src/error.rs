//! Error types for the launch gate

use crate::collaborators::HookError;
use thiserror::Error;

/// Infrastructure errors: channels, spawning and the dispatcher thread
#[derive(Error, Debug)]
pub enum Error {
    /// The output channel already delivered its terminal event
    #[error("output channel for '{0}' has already ended")]
    ChannelEnded(String),

    /// Starting the process failed
    #[error(transparent)]
    Launch(#[from] process_launcher::Error),

    /// The dispatcher thread could not be started
    #[error("failed to start dispatcher thread: {0}")]
    Dispatcher(#[source] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Why a gate did not pass
///
/// These never escape as errors from the orchestrator: they are logged,
/// reported to the user and turned into a `false` result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The referenced configuration does not exist or the reference is unset
    #[error("run configuration {reference} not found")]
    ConfigurationNotFound {
        /// The reference as written
        reference: String,
    },

    /// No execution target is available for the configuration
    #[error("no execution target can run {configuration}")]
    NoSuitableExecutionTarget {
        /// The configuration
        configuration: String,
    },

    /// No runner can start the configuration under the chosen executor
    #[error("no runner can start {configuration} with executor '{executor}'")]
    RunnerUnavailable {
        /// The configuration
        configuration: String,
        /// The chosen executor
        executor: String,
    },

    /// The launch mechanism reported a failure
    #[error("failed to start {configuration}: {reason}")]
    LaunchStartFailure {
        /// The configuration
        configuration: String,
        /// Reported reason
        reason: String,
    },

    /// The process's output never satisfied the trigger
    #[error("trigger condition of {configuration} was not met")]
    ConditionNotMet {
        /// The configuration
        configuration: String,
        /// Whether the process terminated before matching
        process_ended: bool,
    },
}

/// Conditions that abort a launch sequence instead of yielding `false`
#[derive(Error, Debug)]
pub enum Interrupted {
    /// The caller cancelled the wait
    #[error("launch gate was cancelled")]
    Cancelled,

    /// A pre-launch hook failed
    #[error("pre-launch hook '{hook}' failed")]
    Hook {
        /// Hook name
        hook: String,
        /// Hook failure
        #[source]
        source: HookError,
    },
}

impl Interrupted {
    /// Whether the sequence was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Interrupted::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_error_messages() {
        let err = GateError::RunnerUnavailable {
            configuration: "db (command)".into(),
            executor: "debug".into(),
        };
        assert_eq!(
            err.to_string(),
            "no runner can start db (command) with executor 'debug'"
        );
    }

    #[test]
    fn test_hook_failure_keeps_source() {
        let err = Interrupted::Hook {
            hook: "build".into(),
            source: "compilation failed".into(),
        };
        assert!(!err.is_cancelled());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("compilation failed"));
    }
}
