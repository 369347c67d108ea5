//! Assembly of sources, actuators and the sequencer from config, plus the
//! subcommand bodies.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr};
use powerd_bridge::{DriveSource, SensorSource, TcpTransport, UdpBroadcaster};
use powerd_config::{Config, SourceCfg};
use powerd_core::conversions::{ActuatorDeps, build_actuator, build_actuators, steps_from};
use powerd_core::hw_error::map_source_error;
use powerd_core::{JsonFileStore, LogicalState, Sequencer, StateStore, Timing};
use powerd_traits::{MonotonicClock, SignalSource};

fn bridge_timeout(cfg: &Config) -> Duration {
    Duration::from_millis(cfg.bridge.timeout_ms)
}

pub fn build_source(cfg: &Config) -> Box<dyn SignalSource> {
    match &cfg.source {
        SourceCfg::Drive {
            path: Some(path), ..
        } => Box::new(DriveSource::new(path)),
        SourceCfg::Drive { letter, .. } => {
            // Validation guarantees a single letter when no path is set.
            let letter = letter
                .as_deref()
                .and_then(|l| l.chars().next())
                .unwrap_or('F');
            Box::new(DriveSource::from_letter(letter))
        }
        SourceCfg::Sensor { address, connector } => Box::new(SensorSource::new(
            TcpTransport::new(),
            cfg.bridge.qualify(address),
            connector.as_str(),
            bridge_timeout(cfg),
        )),
    }
}

pub fn actuator_deps() -> ActuatorDeps {
    ActuatorDeps {
        transport: Arc::new(TcpTransport::new()),
        broadcaster: Arc::new(UdpBroadcaster::new()),
        clock: Arc::new(MonotonicClock::new()),
    }
}

pub fn build_sequencer(cfg: &Config) -> Result<Sequencer> {
    let store = JsonFileStore::open(&cfg.state.file)?;
    let deps = actuator_deps();
    let timing: Timing = (&cfg.timing).into();

    let mut builder = Sequencer::builder()
        .with_source(build_source(cfg))
        .with_store(store)
        .with_clock(Arc::clone(&deps.clock))
        .with_timing(timing)
        .with_persist_policy(cfg.state.persist.into())
        .with_on_sequence(steps_from(&cfg.sequence.on))
        .with_off_sequence(steps_from(&cfg.sequence.off));
    for actuator in build_actuators(cfg, &deps)? {
        builder = builder.with_boxed_actuator(actuator);
    }
    Ok(builder.build()?)
}

pub fn run_daemon(cfg: &Config, max_ticks: Option<u64>, json: bool) -> Result<()> {
    let mut seq = build_sequencer(cfg)?;
    let timing: Timing = (&cfg.timing).into();

    let (tx, rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .wrap_err("install Ctrl-C handler")?;

    let summary = powerd_core::run(&mut seq, timing.poll_interval, &rx, max_ticks);

    let state = seq.state().map(|s| s.to_string());
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ticks": summary.ticks,
                "transitions": summary.transitions,
                "failed_actuations": summary.failed_actuations,
                "source_errors": summary.source_errors,
                "state": state,
            })
        );
    } else {
        println!(
            "stopped after {} ticks: {} transitions, {} failed actuations, {} source errors; state {}",
            summary.ticks,
            summary.transitions,
            summary.failed_actuations,
            summary.source_errors,
            state.as_deref().unwrap_or("unknown"),
        );
    }
    Ok(())
}

pub fn status(cfg: &Config, json: bool) -> Result<()> {
    let store = JsonFileStore::read_only(&cfg.state.file);
    let record = store.load();
    if json {
        let v = match &record {
            Some(r) => serde_json::to_value(r).wrap_err("encode state")?,
            None => serde_json::json!({ "state": null, "changed_at": null }),
        };
        println!("{v}");
    } else {
        match record {
            Some(r) => println!("{} since {}", r.state, r.changed_at.to_rfc3339()),
            None => println!("unknown (no state recorded at {})", store.path().display()),
        }
    }
    Ok(())
}

pub fn send(cfg: &Config, name: &str, json: bool) -> Result<()> {
    let Some(cmd) = cfg.commands.get(name) else {
        let known: Vec<&str> = cfg.commands.keys().map(String::as_str).collect();
        eyre::bail!("unknown command {name:?} (configured: {})", known.join(", "));
    };
    let mut actuator = build_actuator(name, cmd, &cfg.bridge, &actuator_deps())?;
    let result = actuator.trigger();
    if let Some(err) = result.error {
        return Err(eyre::Report::new(err));
    }
    if json {
        println!("{}", serde_json::json!({ "command": name, "success": true }));
    } else {
        println!("sent {name}");
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let mut source = build_source(cfg);
    let level = source
        .sample()
        .map_err(|e| eyre::Report::new(map_source_error(&*e)))?;
    let state = LogicalState::from_level(level);
    if json {
        println!("{}", serde_json::json!({ "source": "ok", "state": state }));
    } else {
        println!("source ok: {state}");
    }
    Ok(())
}
