//! Maps `Box<dyn Error>` from trait boundaries to typed `PowerdError`.
//!
//! The traits in `powerd_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `powerd_bridge::BridgeError` downcasting.

use crate::error::PowerdError;

/// Map a transport-boundary error to a typed `PowerdError`.
///
/// Attempts to downcast known bridge error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> PowerdError {
    #[cfg(feature = "bridge-errors")]
    {
        use powerd_bridge::error::BridgeError;
        if let Some(be) = e.downcast_ref::<BridgeError>() {
            return match be {
                BridgeError::ConnectTimeout(addr) => PowerdError::ConnectTimeout(addr.clone()),
                BridgeError::ConnectionRefused(addr) => {
                    PowerdError::ConnectionRefused(addr.clone())
                }
                BridgeError::ReadTimeout(addr) => PowerdError::ReadTimeout(addr.clone()),
                other => PowerdError::Transport(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        match io.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                return PowerdError::ConnectionRefused(io.to_string());
            }
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                return classify_timeout(io.to_string());
            }
            _ => {}
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("refused") {
        PowerdError::ConnectionRefused(s)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        classify_timeout(s)
    } else {
        PowerdError::Transport(s)
    }
}

fn classify_timeout(msg: String) -> PowerdError {
    if msg.to_lowercase().contains("connect") {
        PowerdError::ConnectTimeout(msg)
    } else {
        PowerdError::ReadTimeout(msg)
    }
}

/// Any failure to read the signal is "no new information".
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> PowerdError {
    PowerdError::SourceUnavailable(e.to_string())
}
