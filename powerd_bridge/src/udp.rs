use std::net::UdpSocket;

use powerd_traits::{BoxError, Broadcaster};
use tracing::debug;

use crate::error::Result;

/// Sends single UDP datagrams with `SO_BROADCAST` enabled.
#[derive(Debug, Clone, Default)]
pub struct UdpBroadcaster;

impl UdpBroadcaster {
    pub fn new() -> Self {
        Self
    }

    pub fn send_datagram(&self, address: &str, payload: &[u8]) -> Result<()> {
        let sock = UdpSocket::bind(("0.0.0.0", 0))?;
        sock.set_broadcast(true)?;
        let n = sock.send_to(payload, address)?;
        debug!(address, bytes = n, "datagram sent");
        Ok(())
    }
}

impl Broadcaster for UdpBroadcaster {
    fn broadcast(&self, address: &str, payload: &[u8]) -> std::result::Result<(), BoxError> {
        self.send_datagram(address, payload)
            .map_err(|e| Box::new(e) as BoxError)
    }
}
