//! The gate: turns a stream of output into a single outcome
//!
//! A [`Gate`] is single use. It is bound to one channel, subscribes once and
//! resolves exactly once; anything delivered after resolution is ignored.

use crate::channel::{ChannelEvent, OutputChannel, Subscription};
use crate::collaborators::{Notification, Notifier};
use crate::error::Result;
use crate::trigger::TriggerSpec;
use tracing::{debug, info, warn};

/// Title used for every notification raised while gating a launch
pub const NOTIFICATION_TITLE: &str = "Before launch condition";

/// Message shown to the user and written into the process's error output
pub const NOT_MET_MESSAGE: &str = "Trigger Condition not fulfilled, cancelling execution";

/// Final result of one gate attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An output chunk satisfied the trigger
    Matched,
    /// No chunk satisfied the trigger
    NotMatched {
        /// Whether the process terminated; false if the channel went away
        process_ended: bool,
    },
    /// The process never started
    LaunchFailed,
}

impl Outcome {
    /// Whether the launch sequence may continue
    pub fn passed(self) -> bool {
        matches!(self, Outcome::Matched)
    }
}

/// Lifecycle of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Not yet attached to a channel
    Idle,
    /// Listening for output
    Subscribed,
    /// Terminal
    Resolved(Outcome),
}

/// One-shot matcher over a process's output
#[derive(Debug)]
pub struct Gate {
    name: String,
    trigger: TriggerSpec,
    state: GateState,
}

impl Gate {
    /// A fresh gate for the named process
    pub fn new(name: impl Into<String>, trigger: TriggerSpec) -> Self {
        Self {
            name: name.into(),
            trigger,
            state: GateState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> GateState {
        self.state
    }

    /// The outcome, once resolved
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            GateState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Attach to the channel
    ///
    /// Must happen before the channel starts delivering output; the returned
    /// subscription must be kept alive for the whole wait.
    pub fn subscribe(&mut self, channel: &OutputChannel) -> Result<Subscription> {
        let subscription = channel.subscribe()?;
        if self.state == GateState::Idle {
            self.state = GateState::Subscribed;
        }
        debug!(gate = %self.name, "subscribed to output");
        Ok(subscription)
    }

    /// Feed one event; returns the outcome the first time the gate resolves
    pub fn observe(&mut self, event: &ChannelEvent) -> Option<Outcome> {
        if matches!(self.state, GateState::Resolved(_)) {
            return None;
        }
        let outcome = match event {
            ChannelEvent::Starting { pid } => {
                debug!(gate = %self.name, pid = ?pid, "process starting");
                return None;
            }
            ChannelEvent::Chunk(chunk) if self.trigger.is_satisfied_by(&chunk.text) => {
                Outcome::Matched
            }
            ChannelEvent::Chunk(_) => return None,
            ChannelEvent::Ended { code, signal } => {
                debug!(gate = %self.name, code = ?code, signal = ?signal, "process ended before match");
                Outcome::NotMatched {
                    process_ended: true,
                }
            }
        };
        self.state = GateState::Resolved(outcome);
        Some(outcome)
    }

    /// Wait until the gate resolves
    ///
    /// The subscription is consumed and released on return. When the
    /// condition is not met the user is warned and a diagnostic is written
    /// into the process's error output.
    pub async fn wait(mut self, mut subscription: Subscription, notifier: &dyn Notifier) -> Outcome {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }

        let outcome = loop {
            match subscription.next().await {
                Some(event) => {
                    if let Some(outcome) = self.observe(&event) {
                        break outcome;
                    }
                }
                None => {
                    let outcome = Outcome::NotMatched {
                        process_ended: false,
                    };
                    self.state = GateState::Resolved(outcome);
                    break outcome;
                }
            }
        };

        match outcome {
            Outcome::Matched => {
                info!(gate = %self.name, trigger = ?self.trigger.text, "trigger condition met");
            }
            Outcome::NotMatched { process_ended } => {
                warn!(gate = %self.name, process_ended, "trigger condition not met");
                notifier.notify(Notification::warning(NOTIFICATION_TITLE, NOT_MET_MESSAGE));
                subscription.write_diagnostic(NOT_MET_MESSAGE);
            }
            Outcome::LaunchFailed => {}
        }
        outcome
    }
}

/// Subscribe a fresh gate to `channel` and wait for its outcome
pub async fn await_condition(
    channel: &OutputChannel,
    trigger: TriggerSpec,
    notifier: &dyn Notifier,
) -> Result<Outcome> {
    let mut gate = Gate::new(channel.name(), trigger);
    let subscription = gate.subscribe(channel)?;
    Ok(gate.wait(subscription, notifier).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchMode;

    fn contains(text: &str) -> TriggerSpec {
        TriggerSpec::new(MatchMode::Contains, text)
    }

    #[test]
    fn test_state_machine() {
        let channel = OutputChannel::new("db");
        let mut gate = Gate::new("db", contains("MATCH"));
        assert_eq!(gate.state(), GateState::Idle);

        let _subscription = gate.subscribe(&channel).unwrap();
        assert_eq!(gate.state(), GateState::Subscribed);

        assert_eq!(gate.observe(&ChannelEvent::stdout("foo")), None);
        assert_eq!(
            gate.observe(&ChannelEvent::stdout("bar-MATCH")),
            Some(Outcome::Matched)
        );
        assert_eq!(gate.observe(&ChannelEvent::exited(1)), None);
        assert_eq!(gate.state(), GateState::Resolved(Outcome::Matched));
    }

    #[test]
    fn test_stderr_chunks_are_matched_too() {
        let mut gate = Gate::new("db", contains("ready"));
        assert_eq!(
            gate.observe(&ChannelEvent::stderr("server ready\n")),
            Some(Outcome::Matched)
        );
    }
}
