//! Local process launching
//!
//! This crate is the process-launch mechanism used by the launch gate: it turns a
//! [`CommandLine`] into a running child process, a live stream of
//! [`ProcessEvent`]s (start, output chunks, exit) and a [`ProcessHandle`] that
//! can signal the process.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod event;
pub mod launcher;
pub mod local;
pub mod process;

pub use command::CommandLine;
pub use error::{Error, Result};
pub use event::{OutputStream, ProcessEvent, ProcessEventKind};
pub use launcher::{EventStream, Launcher};
pub use local::{LocalLauncher, LocalProcessHandle};
pub use process::{ExitStatus, ProcessHandle};
