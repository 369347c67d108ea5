//! Bridging `powerd_config` types to `powerd_core` runtime types.

use std::sync::Arc;
use std::time::Duration;

use powerd_traits::{Broadcaster, Clock, Transport};

use crate::actuator::{Actuator, CommandSpec, IrActuator, RelayPulseActuator, WakeOnLanActuator};
use crate::config::{PersistPolicy, Step, Timing};
use crate::error::PowerdError;

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&powerd_config::TimingCfg> for Timing {
    fn from(c: &powerd_config::TimingCfg) -> Self {
        Self {
            poll_interval: Duration::from_millis(c.poll_interval_ms),
            confirm_delay: Duration::from_millis(c.confirm_delay_ms),
        }
    }
}

// ── PersistPolicy ────────────────────────────────────────────────────────────

impl From<powerd_config::PersistPolicy> for PersistPolicy {
    fn from(p: powerd_config::PersistPolicy) -> Self {
        match p {
            powerd_config::PersistPolicy::Always => Self::Always,
            powerd_config::PersistPolicy::OnSuccess => Self::OnSuccess,
        }
    }
}

// ── Step ─────────────────────────────────────────────────────────────────────

impl From<&powerd_config::Step> for Step {
    fn from(s: &powerd_config::Step) -> Self {
        Self {
            command: s.command.clone(),
            pause_after: Duration::from_millis(s.pause_after_ms),
            first_on_only: s.first_on_only,
        }
    }
}

pub fn steps_from(steps: &[powerd_config::Step]) -> Vec<Step> {
    steps.iter().map(Step::from).collect()
}

// ── Actuators ────────────────────────────────────────────────────────────────

/// Shared collaborators every actuator may need.
#[derive(Clone)]
pub struct ActuatorDeps {
    pub transport: Arc<dyn Transport + Send + Sync>,
    pub broadcaster: Arc<dyn Broadcaster + Send + Sync>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

/// Build the actuator for one `[commands.<name>]` entry.
pub fn build_actuator(
    name: &str,
    cmd: &powerd_config::CommandCfg,
    bridge: &powerd_config::BridgeCfg,
    deps: &ActuatorDeps,
) -> Result<Box<dyn Actuator>, PowerdError> {
    let timeout = Duration::from_millis(bridge.timeout_ms);
    let actuator: Box<dyn Actuator> = match cmd {
        powerd_config::CommandCfg::Ir {
            address,
            payload,
            expect_reply,
        } => Box::new(IrActuator::new(
            name,
            CommandSpec::new(bridge.qualify(address), payload.as_bytes(), *expect_reply),
            Arc::clone(&deps.transport),
            timeout,
        )),
        powerd_config::CommandCfg::RelayPulse {
            address,
            close,
            release,
            hold_ms,
            expect_reply,
        } => {
            let address = bridge.qualify(address);
            let mut relay = RelayPulseActuator::new(
                name,
                CommandSpec::new(address.clone(), close.as_bytes(), *expect_reply),
                Arc::clone(&deps.transport),
                Arc::clone(&deps.clock),
                timeout,
            )
            .with_hold(Duration::from_millis(*hold_ms));
            if let Some(r) = release {
                relay = relay.with_release(CommandSpec::new(address, r.as_bytes(), *expect_reply));
            }
            Box::new(relay)
        }
        powerd_config::CommandCfg::WakeOnLan { mac, broadcast } => {
            let mac = powerd_config::parse_mac(mac)
                .map_err(|e| PowerdError::Config(format!("commands.{name}: {e}")))?;
            Box::new(WakeOnLanActuator::new(
                name,
                mac,
                powerd_config::with_default_port(broadcast, powerd_config::DEFAULT_WOL_PORT),
                Arc::clone(&deps.broadcaster),
            ))
        }
    };
    Ok(actuator)
}

/// Build every configured actuator, in name order.
pub fn build_actuators(
    cfg: &powerd_config::Config,
    deps: &ActuatorDeps,
) -> Result<Vec<Box<dyn Actuator>>, PowerdError> {
    cfg.commands
        .iter()
        .map(|(name, cmd)| build_actuator(name, cmd, &cfg.bridge, deps))
        .collect()
}
