//! Gate behaviour over an output channel

mod common;

use common::RecordingNotifier;
use std::time::Duration;
use text_gate::gate::NOT_MET_MESSAGE;
use text_gate::{
    ChannelEvent, Gate, GateState, MatchMode, OutputChannel, Outcome, TriggerSpec,
    await_condition,
};

#[smol_potat::test]
async fn test_resolves_on_first_match_and_ignores_the_rest() {
    let channel = OutputChannel::new("db");
    let notifier = RecordingNotifier::default();
    let mut gate = Gate::new("db", TriggerSpec::new(MatchMode::Contains, "MATCH"));
    let subscription = gate.subscribe(&channel).unwrap();

    for chunk in ["foo", "bar-MATCH", "baz"] {
        channel.publish(ChannelEvent::stdout(chunk));
    }
    channel.publish(ChannelEvent::exited(0));

    assert_eq!(gate.wait(subscription, &notifier).await, Outcome::Matched);
    assert_eq!(channel.subscriber_count(), 0);
    assert!(notifier.messages().is_empty());
    assert!(channel.diagnostics().is_empty());
}

#[smol_potat::test]
async fn test_termination_without_match() {
    let channel = OutputChannel::new("db");
    let notifier = RecordingNotifier::default();

    let feeder = channel.clone();
    smol::spawn(async move {
        for chunk in ["foo", "bar"] {
            smol::Timer::after(Duration::from_millis(5)).await;
            feeder.publish(ChannelEvent::stdout(chunk));
        }
        feeder.publish(ChannelEvent::exited(1));
    })
    .detach();

    let trigger = TriggerSpec::new(MatchMode::Contains, "ZZZ");
    let outcome = await_condition(&channel, trigger, &notifier).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::NotMatched {
            process_ended: true
        }
    );
    assert_eq!(notifier.messages(), vec![NOT_MET_MESSAGE.to_string()]);
    assert_eq!(channel.diagnostics(), vec![NOT_MET_MESSAGE.to_string()]);
}

#[smol_potat::test]
async fn test_empty_contains_matches_first_chunk() {
    let channel = OutputChannel::new("db");
    channel.publish(ChannelEvent::Starting { pid: Some(1) });
    let notifier = RecordingNotifier::default();
    let mut gate = Gate::new("db", TriggerSpec::new(MatchMode::Contains, ""));
    let subscription = gate.subscribe(&channel).unwrap();

    channel.publish(ChannelEvent::stderr("anything\n"));
    assert_eq!(gate.wait(subscription, &notifier).await, Outcome::Matched);
}

#[smol_potat::test]
async fn test_exact_compares_whole_chunks() {
    let notifier = RecordingNotifier::default();

    let channel = OutputChannel::new("db");
    let mut gate = Gate::new("db", TriggerSpec::new(MatchMode::Exact, "ready"));
    let subscription = gate.subscribe(&channel).unwrap();
    channel.publish(ChannelEvent::stdout("ready\n"));
    channel.publish(ChannelEvent::exited(0));
    assert!(!gate.wait(subscription, &notifier).await.passed());

    let channel = OutputChannel::new("db");
    let mut gate = Gate::new("db", TriggerSpec::new(MatchMode::Exact, "ready\n"));
    let subscription = gate.subscribe(&channel).unwrap();
    channel.publish(ChannelEvent::stdout("ready\n"));
    assert!(gate.wait(subscription, &notifier).await.passed());
}

#[smol_potat::test]
async fn test_missing_mode_never_matches() {
    let channel = OutputChannel::new("db");
    let notifier = RecordingNotifier::default();
    let trigger = TriggerSpec {
        mode: None,
        text: "ready".into(),
    };
    let mut gate = Gate::new("db", trigger);
    let subscription = gate.subscribe(&channel).unwrap();

    channel.publish(ChannelEvent::stdout("ready"));
    channel.publish(ChannelEvent::exited(0));
    assert!(!gate.wait(subscription, &notifier).await.passed());
}

#[test]
fn test_cannot_subscribe_to_ended_channel() {
    let channel = OutputChannel::new("db");
    channel.publish(ChannelEvent::exited(0));

    let mut gate = Gate::new("db", TriggerSpec::default());
    assert!(gate.subscribe(&channel).is_err());
    assert_eq!(gate.state(), GateState::Idle);
}

#[smol_potat::test]
async fn test_dropped_channel_resolves_not_matched() {
    let channel = OutputChannel::new("db");
    let notifier = RecordingNotifier::default();
    let mut gate = Gate::new("db", TriggerSpec::new(MatchMode::Contains, "ready"));
    let subscription = gate.subscribe(&channel).unwrap();
    drop(channel);

    assert_eq!(
        gate.wait(subscription, &notifier).await,
        Outcome::NotMatched {
            process_ended: false
        }
    );
    assert_eq!(notifier.messages().len(), 1);
}
