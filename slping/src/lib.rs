#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
//! `slping` is a Rust crate implementing the Minecraft Java Edition
//! [Server List Ping](https://wiki.vg/Server_List_Ping) protocol. It queries a
//! server without joining it and collects the version, MOTD, player counts and
//! sample, server icon and round-trip latency.
//!
//! Every ping opens its own connection and shares nothing with other pings, so
//! any number of them can run concurrently on the tokio runtime.
//!
//! The main API surface is [`tokio::ping`](crate::tokio::ping).

#[macro_use]
extern crate tracing;

pub mod address;
pub mod packet;
pub mod tokio;
pub mod varint;

mod java;

pub use address::{AddressError, ServerAddress};
pub use java::{
    DEFAULT_PORT, DEFAULT_TIMEOUT, Java, Player, Players, StatusSnapshot, Version, decode_status,
};

/// The result of a single ping.
pub type PingOutcome = Result<StatusSnapshot, PingError>;

/// Errors that can occur when pinging a server.
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    /// DNS failure, refused or reset connection, or a stream error before the
    /// protocol completed.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] std::io::Error),
    #[error("the ping operation timed out")]
    TimedOut,
    #[error("malformed data: {0}")]
    MalformedData(String),
    #[error("the status response was not valid UTF-8")]
    EncodingFailed,
}

impl PingError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedData(detail.into())
    }

    /// Maps a transport error raised while reading protocol data.
    ///
    /// A stream that closes early is a framing violation rather than a
    /// connection failure, since the peer did connect and then sent too little.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                Self::malformed("stream closed before the packet was complete")
            }
            std::io::ErrorKind::TimedOut => Self::TimedOut,
            _ => Self::ConnectionFailed(err),
        }
    }
}

impl From<std::io::Error> for PingError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::TimedOut,
            _ => Self::ConnectionFailed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_while_reading_is_malformed() {
        let err = PingError::from_read(std::io::ErrorKind::UnexpectedEof.into());
        assert!(matches!(err, PingError::MalformedData(_)));
    }

    #[test]
    fn reset_while_reading_is_connection_failure() {
        let err = PingError::from_read(std::io::ErrorKind::ConnectionReset.into());
        assert!(matches!(err, PingError::ConnectionFailed(_)));
    }

    #[test]
    fn io_timeout_is_timed_out() {
        let err = PingError::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(matches!(err, PingError::TimedOut));
    }
}
