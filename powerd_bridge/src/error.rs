use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("connection refused by {0}")]
    ConnectionRefused(String),
    #[error("read from {0} timed out")]
    ReadTimeout(String),
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("unexpected sensor reply: {0:?}")]
    BadReply(String),
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
