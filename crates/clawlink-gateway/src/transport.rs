//! WebSocket transport.
//!
//! A [`Connector`] opens one full-duplex text connection and hands it back as
//! a pair of channels. The session actor never touches the socket directly,
//! which lets tests drive it with an in-memory connector.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::options::ClientOptions;

/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Frames written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Close with a normal-closure frame and stop writing.
    Close,
}

/// Things read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),

    /// The connection closed. Terminal.
    Closed { code: u16, reason: String },

    /// Read or write failed. Terminal.
    Failed(String),
}

impl TransportEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

/// An open connection.
#[derive(Debug)]
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections to the gateway.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}

/// `tokio-tungstenite` connector.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            write_timeout,
        }
    }

    pub fn from_options(options: &ClientOptions) -> Self {
        Self::new(options.connect_timeout, options.write_timeout)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        debug!(url, "opening websocket");
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let write_timeout = self.write_timeout;
        let writer_events = inbound_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let (message, closing) = match frame {
                    Outbound::Text(text) => (Message::Text(text), false),
                    Outbound::Close => (
                        Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Bye".into(),
                        })),
                        true,
                    ),
                };

                let failure = match tokio::time::timeout(write_timeout, sink.send(message)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some(TransportError::Timeout(write_timeout).to_string()),
                };
                if let Some(reason) = failure {
                    warn!(%reason, "websocket write failed");
                    let _ = writer_events.send(TransportEvent::Failed(reason));
                    return;
                }
                if closing {
                    debug!("websocket close sent");
                    return;
                }
            }
            // Connection handle dropped.
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            let terminal = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "websocket text frame");
                        if inbound_tx.send(TransportEvent::Text(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => TransportEvent::Closed {
                                code: frame.code.into(),
                                reason: frame.reason.into_owned(),
                            },
                            None => TransportEvent::Closed {
                                code: CloseCode::Status.into(),
                                reason: String::new(),
                            },
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break TransportEvent::Failed(e.to_string()),
                    None => {
                        break TransportEvent::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: String::new(),
                        }
                    }
                }
            };
            debug!(?terminal, "websocket reader finished");
            let _ = inbound_tx.send(terminal);
        });

        Ok(Connection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
