//! Error types for process launching

use thiserror::Error;

/// Errors raised while starting or signalling a process
#[derive(Error, Debug)]
pub enum Error {
    /// The program could not be found on `PATH` or at the given location
    #[error("command not found: {program}")]
    CommandNotFound {
        /// The program that was not found
        program: String,
    },

    /// The process could not be started
    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailed {
        /// The program that failed to start
        program: String,
        /// Why the spawn failed
        reason: String,
    },

    /// A signal could not be delivered
    #[error("failed to send signal {signal} to pid {pid}: {reason}")]
    SignalFailed {
        /// The signal number
        signal: i32,
        /// The target process id
        pid: u32,
        /// Why delivery failed
        reason: String,
    },

    /// The operation is not available on this platform
    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify an I/O error raised by `spawn` for the given program
    pub fn from_spawn(program: impl Into<String>, err: std::io::Error) -> Self {
        let program = program.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::CommandNotFound { program }
        } else {
            Self::SpawnFailed {
                program,
                reason: err.to_string(),
            }
        }
    }

    /// Create a signal failed error
    pub fn signal_failed(signal: i32, pid: u32, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            signal,
            pid,
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
