//! WebSocket session client for the agent gateway.
//!
//! This crate provides:
//! - The gateway wire protocol (`req`/`res`/`event` JSON frames)
//! - A challenge-response handshake signed with the device identity
//! - A single-session actor that sends chat requests and session resets and
//!   reassembles streamed replies into one answer per request

pub mod client;
pub mod error;
mod handlers;
pub mod methods;
pub mod options;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::GatewayClient;
pub use error::{ClientError, TransportError};
pub use options::ClientOptions;
pub use session::SessionState;
pub use transport::{Connection, Connector, Outbound, TransportEvent, WsConnector};

/// Result type delivered to request callbacks.
pub type Result<T> = std::result::Result<T, ClientError>;
