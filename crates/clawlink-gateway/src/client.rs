//! Gateway session client.
//!
//! [`GatewayClient`] is a cheap-to-clone handle. All state lives in one actor
//! task that serializes public commands and transport events, so the handle
//! can be used from any task while frames are being processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clawlink_identity::DeviceIdentity;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace};

use crate::error::{ClientError, TransportError};
use crate::methods;
use crate::options::ClientOptions;
use crate::protocol::{ChatSendParams, RequestFrame, SessionsResetParams};
use crate::session::{ConnectionState, Responder, SessionState};
use crate::transport::{Connection, Connector, Outbound, TransportEvent, WsConnector, ABNORMAL_CLOSURE};

/// Commands from handles to the actor.
enum Command {
    Send { text: String, reply: Responder },
    Reset { reply: Responder },
    Disconnect,
}

/// Results of work the actor spawned.
enum ActorEvent {
    Connected {
        generation: u64,
        connection: Connection,
    },
    ConnectFailed {
        generation: u64,
        error: TransportError,
    },
    Transport {
        generation: u64,
        event: TransportEvent,
    },
}

/// Handle to a gateway session.
///
/// One logical conversation over at most one connection. Only the most
/// recent `send_message`/`reset_session` is in flight; starting another one
/// silently supersedes it.
#[derive(Clone)]
pub struct GatewayClient {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionState>,
    paired: Arc<AtomicBool>,
    session_key: Arc<str>,
}

impl GatewayClient {
    /// Create a client that connects over websockets.
    ///
    /// Must be called within a Tokio runtime. No connection is opened until
    /// the first request.
    pub fn new(options: ClientOptions, identity: Arc<DeviceIdentity>) -> Self {
        let connector = Arc::new(WsConnector::from_options(&options));
        Self::with_connector(options, identity, connector)
    }

    /// Create a client using a custom connector.
    pub fn with_connector(
        options: ClientOptions,
        identity: Arc<DeviceIdentity>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let paired = Arc::new(AtomicBool::new(false));
        let session_key: Arc<str> = Arc::from(options.session_key.as_str());

        let actor = SessionActor {
            options,
            identity,
            connector,
            state: ConnectionState::default(),
            state_tx,
            paired: paired.clone(),
            events_tx,
        };
        tokio::spawn(actor.run(commands_rx, events_rx));

        Self {
            commands: commands_tx,
            state_rx,
            paired,
            session_key,
        }
    }

    /// Send a chat message. `callback` receives the assembled reply or an
    /// error, at most once, on a spawned task. It is never called if a later
    /// request supersedes this one.
    pub fn send_message<F>(&self, text: impl Into<String>, callback: F)
    where
        F: FnOnce(crate::Result<String>) + Send + 'static,
    {
        let text = text.into();
        let reply = self.submit(|reply| Command::Send { text, reply });
        spawn_callback(reply, callback);
    }

    /// Start a fresh gateway-side session under the same session key.
    /// `callback` receives the confirmation text or an error.
    pub fn reset_session<F>(&self, callback: F)
    where
        F: FnOnce(crate::Result<String>) + Send + 'static,
    {
        let reply = self.submit(|reply| Command::Reset { reply });
        spawn_callback(reply, callback);
    }

    /// Send a chat message and wait for the reply.
    ///
    /// Returns [`ClientError::Superseded`] if another request replaced this
    /// one first. A clean close from the gateway leaves this pending until
    /// the next request supersedes it.
    pub async fn chat(&self, text: impl Into<String>) -> crate::Result<String> {
        let text = text.into();
        await_reply(self.submit(|reply| Command::Send { text, reply })).await
    }

    /// Reset the session and wait for the confirmation.
    pub async fn reset(&self) -> crate::Result<String> {
        await_reply(self.submit(|reply| Command::Reset { reply })).await
    }

    /// Close the connection. A pending request is not resolved.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Whether the gateway has issued this device a device token.
    pub fn is_paired(&self) -> bool {
        self.paired.load(Ordering::Acquire)
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    fn submit(
        &self,
        command: impl FnOnce(Responder) -> Command,
    ) -> oneshot::Receiver<crate::Result<String>> {
        let (tx, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(rejected)) = self.commands.send(command(tx)) {
            if let Command::Send { reply, .. } | Command::Reset { reply } = rejected {
                let _ = reply.send(Err(ClientError::Shutdown));
            }
        }
        rx
    }
}

fn spawn_callback<F>(reply: oneshot::Receiver<crate::Result<String>>, callback: F)
where
    F: FnOnce(crate::Result<String>) + Send + 'static,
{
    tokio::spawn(async move {
        // A dropped sender means the request was superseded.
        if let Ok(result) = reply.await {
            callback(result);
        }
    });
}

async fn await_reply(reply: oneshot::Receiver<crate::Result<String>>) -> crate::Result<String> {
    reply.await.unwrap_or(Err(ClientError::Superseded))
}

/// Owns the connection state. Handlers for inbound frames live in
/// `crate::handlers`.
pub(crate) struct SessionActor {
    pub(crate) options: ClientOptions,
    pub(crate) identity: Arc<DeviceIdentity>,
    connector: Arc<dyn Connector>,
    pub(crate) state: ConnectionState,
    state_tx: watch::Sender<SessionState>,
    pub(crate) paired: Arc<AtomicBool>,
    events_tx: mpsc::UnboundedSender<ActorEvent>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<ActorEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_actor_event(event),
            }
        }

        debug!("all client handles dropped, stopping session actor");
        self.state.resolve(Err(ClientError::Shutdown));
        if let Some(outbound) = self.state.drop_connection() {
            let _ = outbound.send(Outbound::Close);
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, reply } => {
                self.state.begin_operation(reply);
                debug!(epoch = self.state.epoch, len = text.len(), phase = %self.state.phase, "chat requested");
                if self.state.phase == SessionState::Ready {
                    self.send_chat(text);
                } else {
                    self.state.pending_message = Some(text);
                    self.connect();
                }
            }
            Command::Reset { reply } => {
                self.state.begin_operation(reply);
                debug!(epoch = self.state.epoch, phase = %self.state.phase, "reset requested");
                if self.state.phase == SessionState::Ready {
                    self.send_reset();
                } else {
                    self.connect();
                    self.state.reset_after_connect = true;
                }
            }
            Command::Disconnect => self.disconnect(),
        }
    }

    fn handle_actor_event(&mut self, event: ActorEvent) {
        match event {
            ActorEvent::Connected {
                generation,
                connection,
            } => self.on_connected(generation, connection),
            ActorEvent::ConnectFailed { generation, error } => {
                if generation != self.state.generation {
                    debug!(generation, "ignoring failure of superseded connect");
                    return;
                }
                error!(url = %self.options.url, error = %error, "failed to connect to gateway");
                self.fail(error.into());
            }
            ActorEvent::Transport { generation, event } => {
                if generation != self.state.generation {
                    trace!(generation, "ignoring event from superseded connection");
                    return;
                }
                match event {
                    TransportEvent::Text(text) => self.handle_text(&text),
                    TransportEvent::Closed { code, reason } => {
                        info!(code, %reason, "gateway connection closed");
                        self.teardown();
                    }
                    TransportEvent::Failed(reason) => {
                        error!(%reason, "gateway connection failed");
                        self.fail(ClientError::ConnectionFailed(reason));
                    }
                }
            }
        }
    }

    /// Open a new connection, superseding any existing one.
    fn connect(&mut self) {
        if let Some(outbound) = self.state.drop_connection() {
            let _ = outbound.send(Outbound::Close);
        }
        self.state.response_buffer.clear();
        self.set_phase(SessionState::Connecting);

        let generation = self.state.generation;
        let connector = self.connector.clone();
        let url = self.options.url.clone();
        let events = self.events_tx.clone();
        debug!(%url, generation, "connecting to gateway");

        tokio::spawn(async move {
            let event = match connector.connect(&url).await {
                Ok(connection) => ActorEvent::Connected {
                    generation,
                    connection,
                },
                Err(error) => ActorEvent::ConnectFailed { generation, error },
            };
            let _ = events.send(event);
        });
    }

    fn on_connected(&mut self, generation: u64, connection: Connection) {
        let Connection {
            outbound,
            mut inbound,
        } = connection;

        if generation != self.state.generation {
            debug!(generation, "closing superseded connection");
            let _ = outbound.send(Outbound::Close);
            return;
        }

        info!(url = %self.options.url, "connected to gateway");
        self.state.outbound = Some(outbound);
        self.set_phase(SessionState::AwaitingChallenge);

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                let terminal = event.is_terminal();
                if events
                    .send(ActorEvent::Transport { generation, event })
                    .is_err()
                    || terminal
                {
                    return;
                }
            }
            let _ = events.send(ActorEvent::Transport {
                generation,
                event: TransportEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                    reason: String::new(),
                },
            });
        });
    }

    /// Forget the connection without resolving the in-flight request.
    fn teardown(&mut self) {
        if let Some(outbound) = self.state.drop_connection() {
            let _ = outbound.send(Outbound::Close);
        }
        self.set_phase(SessionState::Disconnected);
    }

    /// Forget the connection and report `error` to the in-flight request.
    fn fail(&mut self, error: ClientError) {
        self.teardown();
        self.state.pending_message = None;
        self.state.response_buffer.clear();
        self.state.resolve(Err(error));
    }

    fn disconnect(&mut self) {
        debug!(phase = %self.state.phase, "disconnect requested");
        self.state.pending_message = None;
        self.teardown();
    }

    pub(crate) fn set_phase(&mut self, phase: SessionState) {
        if self.state.phase != phase {
            debug!(from = %self.state.phase, to = %phase, "session state");
        }
        self.state.phase = phase;
        self.state_tx.send_replace(phase);
    }

    /// Send `chat.send` for the in-flight operation.
    pub(crate) fn send_chat(&mut self, text: String) {
        if self.state.phase != SessionState::Ready {
            self.state.resolve(Err(ClientError::NotConnected));
            return;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let frame = RequestFrame::new(
            methods::CHAT_SEND,
            ChatSendParams {
                message: text,
                session_key: self.options.session_key.clone(),
                idempotency_key: id.clone(),
            },
        )
        .with_id(id);

        self.state.track_request(&frame.id);
        if let Err(e) = self.send_frame(&frame) {
            self.state.resolve(Err(e));
        }
    }

    /// Send `sessions.reset` for the in-flight operation.
    pub(crate) fn send_reset(&mut self) {
        if self.state.phase != SessionState::Ready {
            self.state.resolve(Err(ClientError::NotConnected));
            return;
        }

        let frame = RequestFrame::new(
            methods::SESSIONS_RESET,
            SessionsResetParams {
                key: self.options.session_key.clone(),
            },
        );

        self.state.track_request(&frame.id);
        self.state.pending_reset_id = Some(frame.id.clone());
        if let Err(e) = self.send_frame(&frame) {
            self.state.pending_reset_id = None;
            self.state.resolve(Err(e));
        }
    }

    pub(crate) fn send_frame<P: Serialize>(
        &mut self,
        frame: &RequestFrame<P>,
    ) -> Result<(), ClientError> {
        let text = frame.to_text()?;
        let outbound = self
            .state
            .outbound
            .as_ref()
            .ok_or(ClientError::NotConnected)?;
        outbound
            .send(Outbound::Text(text))
            .map_err(|_| ClientError::ConnectionFailed("connection closed".to_string()))?;
        debug!(method = frame.method, id = %frame.id, "request sent");
        Ok(())
    }
}
