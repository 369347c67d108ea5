//! Named actuation actions built on the transport and broadcast contracts.
//!
//! An actuator never returns an error past `trigger`: failures are folded into
//! the `ActuationResult` so the sequencer can report them and keep going.
//! Nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use powerd_traits::{Broadcaster, Clock, Transport};
use tracing::{debug, warn};

use crate::error::PowerdError;
use crate::hw_error::map_transport_error;

/// Default relay hold between close and release.
pub const DEFAULT_RELAY_HOLD: Duration = Duration::from_millis(350);

/// Opaque command addressed to one bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub address: String,
    pub payload: Vec<u8>,
    pub expect_reply: bool,
}

impl CommandSpec {
    pub fn new(address: impl Into<String>, payload: impl Into<Vec<u8>>, expect_reply: bool) -> Self {
        Self {
            address: address.into(),
            payload: payload.into(),
            expect_reply,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationResult {
    pub actuator: String,
    pub success: bool,
    pub error: Option<PowerdError>,
}

impl ActuationResult {
    pub fn ok(actuator: impl Into<String>) -> Self {
        Self {
            actuator: actuator.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(actuator: impl Into<String>, error: PowerdError) -> Self {
        Self {
            actuator: actuator.into(),
            success: false,
            error: Some(error),
        }
    }
}

pub trait Actuator {
    fn name(&self) -> &str;
    fn trigger(&mut self) -> ActuationResult;
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn trigger(&mut self) -> ActuationResult {
        (**self).trigger()
    }
}

fn send_spec(
    transport: &(dyn Transport + Send + Sync),
    spec: &CommandSpec,
    timeout: Duration,
) -> Result<(), PowerdError> {
    match transport.send(&spec.address, &spec.payload, timeout, spec.expect_reply) {
        Ok(Some(reply)) => {
            debug!(
                address = %spec.address,
                reply = %String::from_utf8_lossy(&reply).trim(),
                "bridge replied"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(map_transport_error(&*e)),
    }
}

/// Sends one IR code.
pub struct IrActuator {
    name: String,
    spec: CommandSpec,
    transport: Arc<dyn Transport + Send + Sync>,
    timeout: Duration,
}

impl IrActuator {
    pub fn new(
        name: impl Into<String>,
        spec: CommandSpec,
        transport: Arc<dyn Transport + Send + Sync>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            spec,
            transport,
            timeout,
        }
    }
}

impl Actuator for IrActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger(&mut self) -> ActuationResult {
        match send_spec(self.transport.as_ref(), &self.spec, self.timeout) {
            Ok(()) => ActuationResult::ok(&self.name),
            Err(e) => {
                warn!(actuator = %self.name, error = %e, "ir send failed");
                ActuationResult::failed(&self.name, e)
            }
        }
    }
}

/// Closes a relay, holds it, then optionally releases it.
pub struct RelayPulseActuator {
    name: String,
    close: CommandSpec,
    release: Option<CommandSpec>,
    hold: Duration,
    transport: Arc<dyn Transport + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    timeout: Duration,
}

impl RelayPulseActuator {
    pub fn new(
        name: impl Into<String>,
        close: CommandSpec,
        transport: Arc<dyn Transport + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            close,
            release: None,
            hold: DEFAULT_RELAY_HOLD,
            transport,
            clock,
            timeout,
        }
    }

    #[must_use]
    pub fn with_release(mut self, release: CommandSpec) -> Self {
        self.release = Some(release);
        self
    }

    #[must_use]
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

impl Actuator for RelayPulseActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger(&mut self) -> ActuationResult {
        if let Err(e) = send_spec(self.transport.as_ref(), &self.close, self.timeout) {
            warn!(actuator = %self.name, error = %e, "relay close failed; skipping release");
            return ActuationResult::failed(&self.name, e);
        }
        self.clock.sleep(self.hold);
        if let Some(release) = &self.release
            && let Err(e) = send_spec(self.transport.as_ref(), release, self.timeout)
        {
            warn!(actuator = %self.name, error = %e, "relay release failed");
            return ActuationResult::failed(&self.name, e);
        }
        ActuationResult::ok(&self.name)
    }
}

/// Broadcasts a Wake-on-LAN magic packet.
pub struct WakeOnLanActuator {
    name: String,
    mac: [u8; 6],
    broadcast: String,
    broadcaster: Arc<dyn Broadcaster + Send + Sync>,
}

impl WakeOnLanActuator {
    pub fn new(
        name: impl Into<String>,
        mac: [u8; 6],
        broadcast: impl Into<String>,
        broadcaster: Arc<dyn Broadcaster + Send + Sync>,
    ) -> Self {
        Self {
            name: name.into(),
            mac,
            broadcast: broadcast.into(),
            broadcaster,
        }
    }
}

impl Actuator for WakeOnLanActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger(&mut self) -> ActuationResult {
        let packet = magic_packet(&self.mac);
        match self.broadcaster.broadcast(&self.broadcast, &packet) {
            Ok(()) => ActuationResult::ok(&self.name),
            Err(e) => {
                let err = map_transport_error(&*e);
                warn!(actuator = %self.name, error = %err, "wake-on-lan failed");
                ActuationResult::failed(&self.name, err)
            }
        }
    }
}

/// Six `0xFF` bytes followed by the MAC repeated sixteen times.
pub fn magic_packet(mac: &[u8; 6]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + 16 * 6);
    out.extend_from_slice(&[0xFF; 6]);
    for _ in 0..16 {
        out.extend_from_slice(mac);
    }
    out
}
