//! Transport protocol abstraction trait.
//!
//! This module defines the `TransportProtocol` trait that abstracts the byte
//! channel carrying encoded RPC messages. The socket and HTTP transports both
//! implement it, so the RPC client never knows which one it talks through.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How RPC messages reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Thrift over a TCP socket
    #[default]
    Binary,
    /// One HTTP POST per RPC
    Http,
}

/// Authentication used on the socket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// SASL PLAIN handshake followed by length-framed messages
    #[default]
    Plain,
    /// Raw unframed messages
    NoSasl,
}

/// A bidirectional byte channel for encoded RPC messages.
///
/// One `round_trip` carries exactly one call and returns exactly one reply.
/// Implementations do not need to be re-entrant; callers serialize access.
#[async_trait]
pub trait TransportProtocol: Send + Sync {
    /// Open the underlying channel.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection or handshake fails.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Send one encoded call and read back the encoded reply.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotOpen` before `open` and
    /// `TransportError::Closed` after `close`.
    async fn round_trip(&mut self, request: Bytes) -> Result<Bytes, TransportError>;

    /// Whether the channel is open.
    fn is_open(&self) -> bool;

    /// Close the channel.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// A resource that must be released when its transport handle closes.
#[async_trait]
pub trait Closeable: Send + Sync {
    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults() {
        assert_eq!(TransportMode::default(), TransportMode::Binary);
        assert_eq!(AuthMode::default(), AuthMode::Plain);
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: TransportMode = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(mode, TransportMode::Http);
        let auth: AuthMode = serde_json::from_str("\"nosasl\"").unwrap();
        assert_eq!(auth, AuthMode::NoSasl);
    }
}
