//! Launcher trait

use crate::command::CommandLine;
use crate::error::Result;
use crate::event::ProcessEvent;
use crate::process::ProcessHandle;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Live, non-replayable stream of events from one process
///
/// Yields `Started` first, then output chunks, then exactly one `Exited`.
pub type EventStream = BoxStream<'static, ProcessEvent>;

/// Something that can start a [`CommandLine`]
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// The process handle type this launcher produces
    type Handle: ProcessHandle + 'static;

    /// Start the command, returning its event stream and a control handle
    ///
    /// Output produced by the process is buffered by the pipes until the
    /// stream is polled, so nothing is lost between spawning and the first
    /// poll.
    async fn launch(&self, command: &CommandLine) -> Result<(EventStream, Self::Handle)>;
}
