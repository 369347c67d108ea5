use std::sync::Arc;
use std::time::Duration;

use powerd_core::mocks::{MemoryStore, ScriptedActuator, TimedSource};
use powerd_core::{LogicalState, Sequencer, Step, TickOutcome};
use powerd_traits::clock::test_clock::TestClock;
use proptest::prelude::*;

const STEP: Duration = Duration::from_secs(1);

/// Reference model: a run of `len` ticks with value `v` differing from the
/// belief fires once iff it lasts long enough to be re-checked after the delay.
fn expected_fires(levels: &[bool], delay_ticks: usize) -> usize {
    let needed = delay_ticks.max(1);
    let mut belief = levels[0];
    let mut fires = 0;
    let mut i = 1;
    while i < levels.len() {
        let v = levels[i];
        let mut len = 1;
        while i + len < levels.len() && levels[i + len] == v {
            len += 1;
        }
        if v != belief && len > needed {
            fires += 1;
            belief = v;
        }
        i += len;
    }
    fires
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, .. ProptestConfig::default() })]

    #[test]
    fn at_most_one_actuation_per_qualifying_run(
        levels in prop::collection::vec(any::<bool>(), 1..60),
        delay_ticks in 0usize..5,
    ) {
        let clock = TestClock::new();
        let on = ScriptedActuator::new("on");
        let off = ScriptedActuator::new("off");
        let mut seq = Sequencer::builder()
            .with_source(TimedSource::new(clock.clone(), STEP, levels.clone()))
            .with_store(MemoryStore::new())
            .with_clock(Arc::new(clock.clone()))
            .with_actuator(on.clone())
            .with_actuator(off.clone())
            .with_on_sequence(vec![Step::new("on")])
            .with_off_sequence(vec![Step::new("off")])
            .with_confirm_delay(STEP * delay_ticks as u32)
            .build()
            .unwrap();

        let mut last_to: Option<LogicalState> = None;
        for k in 0..levels.len() {
            clock.set_offset(STEP * k as u32);
            let outcome = seq.tick();
            if k == 0 {
                prop_assert_eq!(outcome.clone(), TickOutcome::Seeded(LogicalState::from_level(levels[0])));
            }
            if let TickOutcome::Confirmed(report) = outcome {
                // Confirmed transitions alternate direction and always match the signal.
                prop_assert_ne!(Some(report.to), last_to);
                prop_assert_eq!(report.to, LogicalState::from_level(levels[k]));
                last_to = Some(report.to);
            }
        }

        let fires = on.calls() + off.calls();
        prop_assert_eq!(fires, expected_fires(&levels, delay_ticks));
        prop_assert!(on.calls().abs_diff(off.calls()) <= 1);
    }
}

#[test]
fn model_sanity() {
    // OFF,OFF,ON,ON,ON,ON with 3 tick delay: one fire.
    assert_eq!(expected_fires(&[false, false, true, true, true, true], 3), 1);
    // Too short: armed then out of samples.
    assert_eq!(expected_fires(&[false, false, true, true, true], 3), 0);
    // Revert.
    assert_eq!(expected_fires(&[false, true, false, false], 3), 0);
}
