pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A polled boolean indicator: drive presence, sensor level, ...
///
/// `Ok(true)` means the monitored equipment looks powered on.
pub trait SignalSource {
    fn sample(&mut self) -> Result<bool, BoxError>;
}

impl<T: SignalSource + ?Sized> SignalSource for Box<T> {
    fn sample(&mut self) -> Result<bool, BoxError> {
        (**self).sample()
    }
}

/// One-shot request/reply over a fresh connection to a control bridge.
pub trait Transport {
    fn send(
        &self,
        address: &str,
        payload: &[u8],
        timeout: Duration,
        expect_reply: bool,
    ) -> Result<Option<Vec<u8>>, BoxError>;
}

/// Fire-and-forget datagram delivery (Wake-on-LAN).
pub trait Broadcaster {
    fn broadcast(&self, address: &str, payload: &[u8]) -> Result<(), BoxError>;
}
