//! Console-backed collaborators: notifications, process output and hooks

use process_launcher::OutputStream;
use std::io::Write;
use std::sync::Arc;
use text_gate::{
    ExecutionEnvironment, Notification, Notifier, PreLaunchHook, ProcessLog, ProcessLogFactory,
    collaborators::{HookError, Severity},
    spawner::ENV_USER_DATA_PREFIX,
};
use tracing::warn;

/// Shows notifications on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.severity {
            Severity::Info => "ℹ",
            Severity::Warning => "⚠",
            Severity::Error => "✗",
        };
        eprintln!("{marker} {notification}");
    }
}

/// Format one chunk of process output for the console
///
/// The chunk's own line terminator is replaced by a single newline.
pub fn format_line(prefix: &str, text: &str) -> String {
    format!("[{}] {}\n", prefix, text.trim_end_matches(['\n', '\r']))
}

/// Mirrors a process's output to the console, each line prefixed with the
/// configuration name
pub struct ConsoleLog {
    prefix: String,
}

impl ConsoleLog {
    /// Log prefixed with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ProcessLog for ConsoleLog {
    fn record(&self, stream: OutputStream, text: &str) {
        let line = format_line(&self.prefix, text);
        let result = match stream {
            OutputStream::Stdout => std::io::stdout().lock().write_all(line.as_bytes()),
            OutputStream::Stderr => std::io::stderr().lock().write_all(line.as_bytes()),
        };
        if let Err(e) = result {
            warn!(prefix = %self.prefix, "failed to write process output: {}", e);
        }
    }
}

/// One [`ConsoleLog`] per launched process
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLogFactory;

impl ProcessLogFactory for ConsoleLogFactory {
    fn create(&self, environment: &ExecutionEnvironment) -> Arc<dyn ProcessLog> {
        Arc::new(ConsoleLog::new(environment.configuration.name.clone()))
    }
}

/// Variable telling launched processes which configuration the user started
pub const REQUESTED_BY_VAR: &str = "LAUNCH_GATE_REQUESTED_BY";

/// Records the configuration the user asked for in every launch it causes
///
/// The first environment the hook sees fixes the value; prerequisites inherit
/// it through their derived environments.
#[derive(Debug, Default)]
pub struct RequestedByHook;

impl PreLaunchHook for RequestedByHook {
    fn name(&self) -> &str {
        "requested-by"
    }

    fn before_launch(&self, environment: &mut ExecutionEnvironment) -> Result<(), HookError> {
        let key = format!("{ENV_USER_DATA_PREFIX}{REQUESTED_BY_VAR}");
        let name = environment.configuration.name.clone();
        environment.user_data.entry(key).or_insert(name);
        Ok(())
    }
}

/// Refuses launches whose working directory does not exist
#[derive(Debug, Default)]
pub struct WorkingDirHook;

impl PreLaunchHook for WorkingDirHook {
    fn name(&self) -> &str {
        "working-dir"
    }

    fn before_launch(&self, environment: &mut ExecutionEnvironment) -> Result<(), HookError> {
        match &environment.configuration.command.working_dir {
            Some(dir) if !dir.is_dir() => Err(format!(
                "working directory {} of '{}' does not exist",
                dir.display(),
                environment.configuration.name
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// The hooks the CLI runs before every launch, in order
pub fn default_hooks() -> Vec<Arc<dyn PreLaunchHook>> {
    vec![Arc::new(WorkingDirHook), Arc::new(RequestedByHook)]
}
