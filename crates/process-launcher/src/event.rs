//! Raw process events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event observed on a launched process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// When the event was observed
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub kind: ProcessEventKind,
}

/// Which output stream a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Kinds of process events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessEventKind {
    /// The process was started
    Started {
        /// Operating system process id
        pid: u32,
    },
    /// A chunk of output, including its line terminator if one was read
    Output {
        /// Source stream
        stream: OutputStream,
        /// The text as read from the stream
        text: String,
    },
    /// The process exited
    Exited {
        /// Exit code, if it exited normally
        code: Option<i32>,
        /// Terminating signal, if any
        signal: Option<i32>,
    },
}

impl ProcessEvent {
    /// Wrap an event kind with the current timestamp
    pub fn new(kind: ProcessEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Start event
    pub fn started(pid: u32) -> Self {
        Self::new(ProcessEventKind::Started { pid })
    }

    /// Output chunk event
    pub fn output(stream: OutputStream, text: impl Into<String>) -> Self {
        Self::new(ProcessEventKind::Output {
            stream,
            text: text.into(),
        })
    }

    /// Exit event
    pub fn exited(code: Option<i32>, signal: Option<i32>) -> Self {
        Self::new(ProcessEventKind::Exited { code, signal })
    }

    /// Text carried by an output event
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ProcessEventKind::Output { text, .. } => Some(text),
            _ => None,
        }
    }
}
