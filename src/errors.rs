//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering every failure of a line exchange.
///
/// End-of-stream is not represented here: a peer closing the connection is
/// reported through [`crate::client::ResponseLine::saw_eof`].
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Endpoint missing or no listener bound at the socket path.
    Connect(String),
    /// Transport rejected or failed the request write.
    Write(String),
    /// Transport failed while reading the response.
    Read(String),
    /// Operation not allowed in the connection's current state.
    Protocol(String),
    /// Read deadline elapsed before a line was complete.
    Timeout(String),
    /// Exchange cancelled by the operator.
    Cancelled(String),
    /// Response exceeded the configured line length limit.
    LineTooLong(String),
    /// File-system or other I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Connect(msg) => write!(f, "connect: {msg}"),
            Self::Write(msg) => write!(f, "write: {msg}"),
            Self::Read(msg) => write!(f, "read: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
            Self::LineTooLong(msg) => write!(f, "line too long: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
