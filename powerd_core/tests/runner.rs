use std::time::Duration;

use crossbeam_channel::unbounded;
use powerd_core::mocks::{MemoryStore, ScriptedActuator, ScriptedSource};
use powerd_core::{LogicalState, RunSummary, Sequencer, Step, run};

fn seq(levels: &[bool], actuator: &ScriptedActuator) -> Sequencer {
    Sequencer::builder()
        .with_source(ScriptedSource::levels(levels))
        .with_store(MemoryStore::new())
        .with_actuator(actuator.clone())
        .with_on_sequence(vec![Step::new("on")])
        .with_confirm_delay(Duration::ZERO)
        .build()
        .unwrap()
}

#[test]
fn stops_after_max_ticks() {
    let a = ScriptedActuator::new("on");
    let mut s = seq(&[false], &a);
    let (_tx, rx) = unbounded::<()>();
    let summary = run(&mut s, Duration::from_millis(1), &rx, Some(3));
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.transitions, 0);
}

#[test]
fn zero_tick_budget_never_samples() {
    let a = ScriptedActuator::new("on");
    let mut s = seq(&[true], &a);
    let (_tx, rx) = unbounded::<()>();
    let summary = run(&mut s, Duration::from_millis(1), &rx, Some(0));
    assert_eq!(summary, RunSummary::default());
    assert_eq!(s.state(), None);
}

#[test]
fn shutdown_message_ends_loop() {
    let a = ScriptedActuator::new("on");
    let mut s = seq(&[false], &a);
    let (tx, rx) = unbounded::<()>();
    tx.send(()).unwrap();
    let summary = run(&mut s, Duration::from_secs(60), &rx, None);
    assert_eq!(summary.ticks, 1);
}

#[test]
fn dropped_sender_ends_loop() {
    let a = ScriptedActuator::new("on");
    let mut s = seq(&[false], &a);
    let (tx, rx) = unbounded::<()>();
    drop(tx);
    let summary = run(&mut s, Duration::from_secs(60), &rx, None);
    assert_eq!(summary.ticks, 1);
}

#[test]
fn counts_confirmed_transitions() {
    let a = ScriptedActuator::new("on");
    // seed OFF, arm ON, confirm ON
    let mut s = seq(&[false, true, true], &a);
    let (_tx, rx) = unbounded::<()>();
    let summary = run(&mut s, Duration::from_millis(1), &rx, Some(3));
    assert_eq!(summary.transitions, 1);
    assert_eq!(summary.failed_actuations, 0);
    assert_eq!(a.calls(), 1);
    assert_eq!(s.state(), Some(LogicalState::On));
}
