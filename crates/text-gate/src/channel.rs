//! Process output channel
//!
//! An [`OutputChannel`] fans the events of one launched process out to any
//! number of [`Subscription`]s. Subscribing is explicit and unsubscribing is
//! tied to dropping the subscription, so a gate that is cancelled or resolves
//! early never leaves a listener behind.
//!
//! The channel is fed by [`OutputChannel::pump`], which adapts a
//! [`process_launcher::EventStream`]. Subscribers attached before the pump is
//! started see every event the process produces.

use crate::error::{Error, Result};
use async_channel::{Receiver, Sender};
use futures::StreamExt;
use process_launcher::{EventStream, OutputStream, ProcessEventKind};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace};

/// One chunk of process output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Source stream
    pub stream: OutputStream,
    /// Text as produced by the process
    pub text: String,
}

/// Events delivered to subscribers, in process order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The process is starting
    Starting {
        /// Process id, if known
        pid: Option<u32>,
    },
    /// Output from either stream
    Chunk(OutputChunk),
    /// The process is gone; always the last event
    Ended {
        /// Exit code, if it exited normally
        code: Option<i32>,
        /// Terminating signal, if any
        signal: Option<i32>,
    },
}

impl ChannelEvent {
    /// Output chunk on standard output
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::Chunk(OutputChunk {
            stream: OutputStream::Stdout,
            text: text.into(),
        })
    }

    /// Output chunk on standard error
    pub fn stderr(text: impl Into<String>) -> Self {
        Self::Chunk(OutputChunk {
            stream: OutputStream::Stderr,
            text: text.into(),
        })
    }

    /// Ended event with an exit code
    pub fn exited(code: i32) -> Self {
        Self::Ended {
            code: Some(code),
            signal: None,
        }
    }
}

/// The launched process's own output log, as shown to the user
pub trait ProcessLog: Send + Sync {
    /// Record a line of output or a diagnostic
    fn record(&self, stream: OutputStream, text: &str);
}

/// Broadcast point for the events of one process
#[derive(Clone)]
pub struct OutputChannel {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    log: Option<Arc<dyn ProcessLog>>,
    state: Mutex<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
    next_id: u64,
    subscribers: Vec<(u64, Sender<ChannelEvent>)>,
    ended: bool,
    diagnostics: Vec<String>,
}

impl OutputChannel {
    /// A channel with no process log
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// A channel that mirrors output and diagnostics into a process log
    pub fn with_log(name: impl Into<String>, log: Arc<dyn ProcessLog>) -> Self {
        Self::build(name.into(), Some(log))
    }

    fn build(name: String, log: Option<Arc<dyn ProcessLog>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                log,
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    /// Name of the process this channel belongs to
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Attach a new subscriber
    ///
    /// Fails once the channel has ended: an ended channel never delivers
    /// anything again.
    pub fn subscribe(&self) -> Result<Subscription> {
        let mut state = self.shared.state.lock().unwrap();
        if state.ended {
            return Err(Error::ChannelEnded(self.shared.name.clone()));
        }
        let id = state.next_id;
        state.next_id += 1;
        let (sender, receiver) = async_channel::unbounded();
        state.subscribers.push((id, sender));
        trace!(channel = %self.shared.name, id, "subscribed");

        Ok(Subscription {
            id,
            receiver,
            channel: Arc::downgrade(&self.shared),
        })
    }

    /// Deliver an event to every subscriber
    ///
    /// Returns false, delivering nothing, if the channel has already ended.
    pub fn publish(&self, event: ChannelEvent) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        if state.ended {
            return false;
        }
        if let (Some(log), ChannelEvent::Chunk(chunk)) = (&self.shared.log, &event) {
            log.record(chunk.stream, &chunk.text);
        }
        if matches!(event, ChannelEvent::Ended { .. }) {
            state.ended = true;
        }
        for (_, sender) in &state.subscribers {
            // A closed receiver belongs to a subscription that is being dropped
            let _ = sender.try_send(event.clone());
        }
        true
    }

    /// Whether the terminal event has been published
    pub fn is_ended(&self) -> bool {
        self.shared.state.lock().unwrap().ended
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().unwrap().subscribers.len()
    }

    /// Write a diagnostic line into the process's error output
    pub fn write_diagnostic(&self, text: &str) {
        self.shared.write_diagnostic(text);
    }

    /// Diagnostics written so far
    pub fn diagnostics(&self) -> Vec<String> {
        self.shared.state.lock().unwrap().diagnostics.clone()
    }

    /// Feed the channel from a launcher's event stream until the process ends
    ///
    /// Exactly one `Ended` event is published, even if the stream stops
    /// without reporting an exit.
    pub async fn pump(self, mut events: EventStream) {
        while let Some(event) = events.next().await {
            let event = match event.kind {
                ProcessEventKind::Started { pid } => ChannelEvent::Starting { pid: Some(pid) },
                ProcessEventKind::Output { stream, text } => {
                    ChannelEvent::Chunk(OutputChunk { stream, text })
                }
                ProcessEventKind::Exited { code, signal } => ChannelEvent::Ended { code, signal },
            };
            let ended = matches!(event, ChannelEvent::Ended { .. });
            self.publish(event);
            if ended {
                debug!(channel = %self.name(), "process ended");
                return;
            }
        }
        debug!(channel = %self.name(), "event stream closed without exit status");
        self.publish(ChannelEvent::Ended {
            code: None,
            signal: None,
        });
    }
}

impl Shared {
    fn write_diagnostic(&self, text: &str) {
        if let Some(log) = &self.log {
            log.record(OutputStream::Stderr, text);
        }
        self.state.lock().unwrap().diagnostics.push(text.to_string());
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        state.subscribers.retain(|(sub_id, _)| *sub_id != id);
        trace!(channel = %self.name, id, "unsubscribed");
    }
}

/// A live listener on an [`OutputChannel`]
///
/// Dropping the subscription detaches it from the channel.
pub struct Subscription {
    id: u64,
    receiver: Receiver<ChannelEvent>,
    channel: Weak<Shared>,
}

impl Subscription {
    /// Next event, or `None` once the channel itself is gone
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.receiver.recv().await.ok()
    }

    /// Write a diagnostic into the observed process's error output
    pub fn write_diagnostic(&self, text: &str) {
        if let Some(shared) = self.channel.upgrade() {
            shared.write_diagnostic(text);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.channel.upgrade() {
            shared.unsubscribe(self.id);
        }
    }
}
