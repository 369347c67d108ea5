//! Plain-TCP command transport for IR/relay bridges.
//!
//! Every call opens a fresh connection, writes one CRLF-terminated command and
//! optionally performs a single bounded read. The stream is dropped on every
//! exit path.
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use powerd_traits::{BoxError, Transport};
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};

/// Size of the single reply read.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// `connect_timeout` rejects a zero duration.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct TcpTransport {
    buffer_size: usize,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Send `payload` to `address` ("host:port") and optionally read one reply.
    pub fn send_command(
        &self,
        address: &str,
        payload: &[u8],
        timeout: Duration,
        expect_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let timeout = timeout.max(MIN_TIMEOUT);
        let mut stream = connect(address, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let framed = frame(payload);
        debug!(address, bytes = framed.len(), "bridge send");
        stream.write_all(&framed)?;

        if !expect_reply {
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(None);
        }

        let mut buf = vec![0u8; self.buffer_size];
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Err(BridgeError::ReadTimeout(address.to_string())),
            Err(e) => return Err(BridgeError::Io(e)),
        };
        buf.truncate(n);
        trace!(address, reply = %String::from_utf8_lossy(&buf).trim(), "bridge reply");
        let _ = stream.shutdown(Shutdown::Both);
        Ok(Some(buf))
    }
}

impl Transport for TcpTransport {
    fn send(
        &self,
        address: &str,
        payload: &[u8],
        timeout: Duration,
        expect_reply: bool,
    ) -> std::result::Result<Option<Vec<u8>>, BoxError> {
        self.send_command(address, payload, timeout, expect_reply)
            .map_err(|e| Box::new(e) as BoxError)
    }
}

/// Append CRLF unless the payload already carries it.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.extend_from_slice(payload);
    if !payload.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn connect(address: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = address
        .to_socket_addrs()
        .map_err(|e| BridgeError::Resolve(format!("{address}: {e}")))?
        .collect();
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(s) => return Ok(s),
            Err(e) => {
                trace!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(classify_connect_error(address, e)),
        None => Err(BridgeError::Resolve(format!("{address}: no addresses"))),
    }
}

/// Map a connect-phase I/O error onto the bridge taxonomy.
pub fn classify_connect_error(address: &str, e: io::Error) -> BridgeError {
    match e.kind() {
        _ if is_timeout(&e) => BridgeError::ConnectTimeout(address.to_string()),
        io::ErrorKind::ConnectionRefused => BridgeError::ConnectionRefused(address.to_string()),
        _ => BridgeError::Io(e),
    }
}

#[inline]
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
