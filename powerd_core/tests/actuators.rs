use std::sync::Arc;
use std::time::Duration;

use powerd_core::conversions::{ActuatorDeps, build_actuator, build_actuators, steps_from};
use powerd_core::mocks::{InjectedFailure, RecordingBroadcaster, RecordingTransport};
use powerd_core::{
    Actuator, CommandSpec, IrActuator, PowerdError, RelayPulseActuator, Step, magic_packet,
};
use powerd_traits::clock::test_clock::TestClock;
use rstest::rstest;

const TIMEOUT: Duration = Duration::from_secs(5);

fn relay(transport: &RecordingTransport, clock: &TestClock) -> RelayPulseActuator {
    RelayPulseActuator::new(
        "relay",
        CommandSpec::new("10.0.0.2:4998", "setstate,1:1,1", true),
        Arc::new(transport.clone()),
        Arc::new(clock.clone()),
        TIMEOUT,
    )
    .with_release(CommandSpec::new("10.0.0.2:4998", "setstate,1:1,0", true))
}

#[test]
fn relay_pulse_closes_holds_and_releases() {
    let transport = RecordingTransport::new();
    let clock = TestClock::new();
    let mut a = relay(&transport, &clock);

    let res = a.trigger();
    assert!(res.success, "{res:?}");
    assert_eq!(res.actuator, "relay");
    assert_eq!(
        transport.sent_payloads(),
        vec!["setstate,1:1,1", "setstate,1:1,0"]
    );
    assert_eq!(clock.elapsed(), Duration::from_millis(350));
}

#[test]
fn relay_hold_is_configurable() {
    let transport = RecordingTransport::new();
    let clock = TestClock::new();
    let mut a = relay(&transport, &clock).with_hold(Duration::from_millis(1200));
    assert!(a.trigger().success);
    assert_eq!(clock.elapsed(), Duration::from_millis(1200));
}

#[test]
fn relay_close_failure_skips_release() {
    let transport = RecordingTransport::new();
    transport.fail_address("10.0.0.2:4998", InjectedFailure::ConnectTimeout);
    let clock = TestClock::new();
    let mut a = relay(&transport, &clock);

    let res = a.trigger();
    assert!(!res.success);
    assert!(matches!(res.error, Some(PowerdError::ConnectTimeout(_))));
    assert!(transport.sent().is_empty());
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[rstest]
#[case(InjectedFailure::ConnectTimeout, "connect timeout")]
#[case(InjectedFailure::ConnectionRefused, "connection refused")]
#[case(InjectedFailure::ReadTimeout, "read timeout")]
fn ir_failure_is_captured_not_raised(#[case] failure: InjectedFailure, #[case] prefix: &str) {
    let transport = RecordingTransport::new();
    transport.fail_address("10.0.0.3:4998", failure);
    let mut a = IrActuator::new(
        "ir_1",
        CommandSpec::new("10.0.0.3:4998", "sendir,1:1,1,36000", true),
        Arc::new(transport),
        TIMEOUT,
    );
    let res = a.trigger();
    assert!(!res.success);
    let err = res.error.expect("error captured");
    assert!(err.to_string().starts_with(prefix), "got {err}");
}

#[test]
fn magic_packet_is_102_bytes() {
    let p = magic_packet(&[1, 2, 3, 4, 5, 6]);
    assert_eq!(p.len(), 102);
    assert_eq!(&p[96..], &[1, 2, 3, 4, 5, 6]);
}

// ── Built from configuration ─────────────────────────────────────────────────

const CFG: &str = r#"
[source]
kind = "sensor"
address = "10.0.0.2"

[bridge]
port = 4998

[commands.relay]
kind = "relay_pulse"
address = "10.0.0.2"
close = "setstate,1:1,1"
release = "setstate,1:1,0"
hold_ms = 100

[commands.ir_1]
kind = "ir"
address = "10.0.0.3:4999"
payload = "sendir,1:1,1,36000"
expect_reply = false

[commands.wol]
kind = "wake_on_lan"
mac = "00:11:22:33:44:55"
broadcast = "192.168.1.255:9"

[sequence]
on = ["relay", { command = "wol", pause_after_ms = 12000, first_on_only = true }, "ir_1"]
off = ["ir_1"]
"#;

#[test]
fn actuators_built_from_config_hit_qualified_addresses() {
    let cfg = powerd_config::load_toml(CFG).unwrap();
    cfg.validate().unwrap();

    let transport = RecordingTransport::new();
    let broadcaster = RecordingBroadcaster::new();
    let clock = TestClock::new();
    let deps = ActuatorDeps {
        transport: Arc::new(transport.clone()),
        broadcaster: Arc::new(broadcaster.clone()),
        clock: Arc::new(clock.clone()),
    };

    let mut actuators = build_actuators(&cfg, &deps).unwrap();
    let names: Vec<_> = actuators.iter().map(|a| a.name().to_string()).collect();
    assert_eq!(names, vec!["ir_1", "relay", "wol"]);

    for a in &mut actuators {
        assert!(a.trigger().success);
    }

    let sent = transport.sent();
    assert_eq!(sent[0].0, "10.0.0.3:4999");
    assert_eq!(sent[1].0, "10.0.0.2:4998");
    assert_eq!(sent[2].0, "10.0.0.2:4998");
    assert_eq!(clock.elapsed(), Duration::from_millis(100));

    let wol = broadcaster.sent();
    assert_eq!(wol[0].0, "192.168.1.255:9");
    assert_eq!(wol[0].1, magic_packet(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));

    let on = steps_from(&cfg.sequence.on);
    assert_eq!(on[0], Step::new("relay"));
    assert_eq!(
        on[1],
        Step::new("wol")
            .pause_after(Duration::from_secs(12))
            .first_on_only()
    );
}

#[test]
fn bad_mac_is_config_error() {
    let cmd = powerd_config::CommandCfg::WakeOnLan {
        mac: "zz".into(),
        broadcast: "255.255.255.255:9".into(),
    };
    let deps = ActuatorDeps {
        transport: Arc::new(RecordingTransport::new()),
        broadcaster: Arc::new(RecordingBroadcaster::new()),
        clock: Arc::new(TestClock::new()),
    };
    let err = build_actuator("wol", &cmd, &powerd_config::BridgeCfg::default(), &deps)
        .err()
        .expect("bad mac");
    assert!(matches!(err, PowerdError::Config(_)));
}

#[rstest]
#[case("192.168.1.255", "192.168.1.255:9")]
#[case("192.168.1.255:7", "192.168.1.255:7")]
#[case("lan-broadcast.local", "lan-broadcast.local:9")]
fn wol_broadcast_without_port_targets_port_9(#[case] broadcast: &str, #[case] want: &str) {
    let cmd = powerd_config::CommandCfg::WakeOnLan {
        mac: "AA-BB-CC-DD-EE-FF".into(),
        broadcast: broadcast.into(),
    };
    let broadcaster = RecordingBroadcaster::new();
    let deps = ActuatorDeps {
        transport: Arc::new(RecordingTransport::new()),
        broadcaster: Arc::new(broadcaster.clone()),
        clock: Arc::new(TestClock::new()),
    };
    let Ok(mut a) = build_actuator("wol", &cmd, &powerd_config::BridgeCfg::default(), &deps) else {
        panic!("wake-on-lan actuator should build");
    };
    assert!(a.trigger().success);
    assert_eq!(broadcaster.sent()[0].0, want);
}
