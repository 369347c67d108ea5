//! Concrete signal sources: mounted-drive presence and bridge sensor level.
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use powerd_traits::{BoxError, SignalSource, Transport};
use tracing::{debug, trace};

use crate::error::BridgeError;

/// Reports ON while `path` exists.
#[derive(Debug, Clone)]
pub struct DriveSource {
    path: PathBuf,
}

impl DriveSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "drive source monitoring path");
        Self { path }
    }

    /// Monitor the mount point of a Windows drive letter.
    pub fn from_letter(letter: char) -> Self {
        Self::new(drive_letter_path(letter))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SignalSource for DriveSource {
    fn sample(&mut self) -> Result<bool, BoxError> {
        match std::fs::metadata(&self.path) {
            Ok(_) => {
                trace!(path = %self.path.display(), "drive present");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "drive absent");
                Ok(false)
            }
            Err(e) => Err(Box::new(BridgeError::Unreadable {
                path: self.path.display().to_string(),
                source: e,
            })),
        }
    }
}

/// `F` -> `F:\` on Windows, `/mnt/f/` elsewhere (WSL mount layout).
pub fn drive_letter_path(letter: char) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(format!("{}:\\", letter.to_ascii_uppercase()))
    } else {
        PathBuf::from(format!("/mnt/{}/", letter.to_ascii_lowercase()))
    }
}

/// Reads a contact-closure/voltage sensor through the bridge's `getstate` command.
pub struct SensorSource<T: Transport> {
    transport: T,
    address: String,
    connector: String,
    timeout: Duration,
}

impl<T: Transport> SensorSource<T> {
    pub fn new(
        transport: T,
        address: impl Into<String>,
        connector: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            address: address.into(),
            connector: connector.into(),
            timeout,
        }
    }

    pub fn command(&self) -> String {
        format!("getstate,{}", self.connector)
    }
}

impl<T: Transport> SignalSource for SensorSource<T> {
    fn sample(&mut self) -> Result<bool, BoxError> {
        let reply = self
            .transport
            .send(&self.address, self.command().as_bytes(), self.timeout, true)?
            .unwrap_or_default();
        let text = String::from_utf8_lossy(&reply);
        let level = parse_sensor_reply(&self.connector, &text)?;
        trace!(connector = %self.connector, level, "sensor level");
        Ok(level)
    }
}

/// Parse `state,<connector>,<0|1>` into a level.
pub fn parse_sensor_reply(connector: &str, reply: &str) -> Result<bool, BridgeError> {
    let reply = reply.trim();
    let prefix = format!("state,{connector},");
    match reply.strip_prefix(prefix.as_str()) {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        _ => Err(BridgeError::BadReply(reply.to_string())),
    }
}
