//! Network and filesystem adapters for the power daemon.
//!
//! Implements the `powerd_traits` contracts against real endpoints: TCP
//! command bridges, UDP broadcast and local mount points.
pub mod error;
pub mod source;
pub mod transport;
pub mod udp;

pub use error::BridgeError;
pub use source::{DriveSource, SensorSource};
pub use transport::TcpTransport;
pub use udp::UdpBroadcaster;
