use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PowerdError {
    #[error("signal source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("connect timeout: {0}")]
    ConnectTimeout(String),
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("read timeout: {0}")]
    ReadTimeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing signal source")]
    MissingSource,
    #[error("missing state store")]
    MissingStore,
    #[error("sequence step references unknown command {0:?}")]
    UnknownCommand(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
