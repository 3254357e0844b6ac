//! Gateway client error types.

use std::time::Duration;
use thiserror::Error;

/// The single normalized error delivered for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A request was attempted while the session was not ready.
    #[error("Not connected")]
    NotConnected,

    /// The transport failed to connect, read or write.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The gateway answered with a failure envelope. Carries its message.
    #[error("{0}")]
    Gateway(String),

    /// An outbound frame could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// A newer request replaced this one before it completed.
    #[error("Request superseded")]
    Superseded,

    /// The client actor is no longer running.
    #[error("Client shut down")]
    Shutdown,
}

/// Errors opening a transport connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The websocket handshake failed.
    #[error("{0}")]
    Connect(String),

    /// The websocket handshake did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        Self::ConnectionFailed(e.to_string())
    }
}
