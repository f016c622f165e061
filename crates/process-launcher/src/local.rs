//! Local process launcher implementation

use async_process::Stdio;
use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use futures_lite::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::command::CommandLine;
use crate::error::{Error, Result};
use crate::event::{OutputStream, ProcessEvent};
use crate::launcher::{EventStream, Launcher};
use crate::process::{ExitStatus, ProcessHandle};

/// Launcher for processes on the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

/// Signal handle for a process started by [`LocalLauncher`]
///
/// The child itself is owned by the event stream, which reaps it and reports
/// the exit status. Dropping the stream before the process exits kills it.
#[derive(Debug, Clone)]
pub struct LocalProcessHandle {
    pid: u32,
    program: String,
}

#[async_trait]
impl Launcher for LocalLauncher {
    type Handle = LocalProcessHandle;

    async fn launch(&self, command: &CommandLine) -> Result<(EventStream, Self::Handle)> {
        let mut cmd = command.prepare();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::from_spawn(command.program.clone(), e))?;
        let pid = child.id();
        debug!(pid, command = %command.display(), "spawned local process");

        let stdout = match child.stdout.take() {
            Some(out) => chunk_stream(out, OutputStream::Stdout),
            None => stream::empty().boxed(),
        };
        let stderr = match child.stderr.take() {
            Some(err) => chunk_stream(err, OutputStream::Stderr),
            None => stream::empty().boxed(),
        };

        let exit = stream::once(async move {
            let mut child = child;
            match child.status().await {
                Ok(status) => {
                    let status = ExitStatus::from(status);
                    ProcessEvent::exited(status.code, status.signal)
                }
                Err(e) => {
                    warn!(pid, "failed to reap process: {}", e);
                    ProcessEvent::exited(None, None)
                }
            }
        });

        let events = stream::once(future::ready(ProcessEvent::started(pid)))
            .chain(stream::select(stdout, stderr))
            .chain(exit)
            .boxed();

        let handle = LocalProcessHandle {
            pid,
            program: command.program.clone(),
        };

        Ok((events, handle))
    }
}

/// Bytes requested from a pipe per read
const READ_BUFFER: usize = 8192;

/// Read a pipe chunk by chunk
///
/// Each read is split after every line terminator. Text after the last
/// terminator is emitted right away rather than held for the rest of its
/// line, so prompts that never print a newline still reach subscribers.
fn chunk_stream<R>(pipe: R, source: OutputStream) -> BoxStream<'static, ProcessEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader = PipeReader {
        pipe,
        pending: Vec::new(),
        closed: false,
    };
    stream::unfold(reader, move |mut reader| async move {
        let texts = reader.next_texts(source).await?;
        let events = texts
            .into_iter()
            .map(move |text| ProcessEvent::output(source, text));
        Some((stream::iter(events), reader))
    })
    .flatten()
    .boxed()
}

struct PipeReader<R> {
    pipe: R,
    /// Start of a UTF-8 sequence cut off by the previous read
    pending: Vec<u8>,
    closed: bool,
}

impl<R: AsyncRead + Unpin> PipeReader<R> {
    async fn next_texts(&mut self, source: OutputStream) -> Option<Vec<String>> {
        if self.closed {
            return None;
        }

        let mut buf = [0u8; READ_BUFFER];
        match self.pipe.read(&mut buf).await {
            Ok(0) => self.closed = true,
            Ok(n) => self.pending.extend_from_slice(&buf[..n]),
            Err(e) => {
                debug!(?source, "pipe read failed: {}", e);
                self.closed = true;
            }
        }

        let keep = if self.closed {
            0
        } else {
            incomplete_tail(&self.pending)
        };
        let rest = self.pending.split_off(self.pending.len() - keep);
        let bytes = std::mem::replace(&mut self.pending, rest);
        let text = String::from_utf8_lossy(&bytes);
        Some(text.split_inclusive('\n').map(str::to_string).collect())
    }
}

/// Length of an unfinished UTF-8 sequence at the end of `bytes`
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

impl LocalProcessHandle {
    /// Name of the program this handle controls
    pub fn program(&self) -> &str {
        &self.program
    }

    #[cfg(unix)]
    fn send(&self, signal: nix::sys::signal::Signal) -> Result<()> {
        use nix::unistd::Pid;

        nix::sys::signal::kill(Pid::from_raw(self.pid as i32), signal)
            .map_err(|e| Error::signal_failed(signal as i32, self.pid, e.to_string()))
    }
}

#[async_trait]
impl ProcessHandle for LocalProcessHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn terminate(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            self.send(nix::sys::signal::Signal::SIGTERM)
        }

        #[cfg(not(unix))]
        {
            Err(Error::Unsupported("terminate"))
        }
    }

    async fn kill(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            self.send(nix::sys::signal::Signal::SIGKILL)
        }

        #[cfg(not(unix))]
        {
            Err(Error::Unsupported("kill"))
        }
    }
}
