//! Gateway session state.
//!
//! [`ConnectionState`] is owned exclusively by the session actor; nothing in
//! here is shared or locked.

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::error::ClientError;
use crate::transport::Outbound;

/// How many superseded request and run ids are remembered.
const RETIRED_IDS: usize = 32;

/// Connection lifecycle as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingChallenge,
    Authenticating,
    /// The only state in which requests are sent immediately.
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingChallenge => "awaiting-challenge",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Where a request result is delivered.
pub(crate) type Responder = oneshot::Sender<Result<String, ClientError>>;

/// Challenge received and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Challenge {
    pub nonce: String,
    pub ts: Option<i64>,
}

/// The single operation whose result the caller is waiting for.
#[derive(Debug)]
pub(crate) struct InFlight {
    /// Operation epoch this slot was opened under.
    pub epoch: u64,
    /// Ids of requests sent on behalf of this operation.
    pub request_ids: Vec<String>,
    /// Run the gateway assigned to our `chat.send`, once acknowledged.
    pub run_id: Option<String>,
    responder: Option<Responder>,
}

impl InFlight {
    fn new(epoch: u64, responder: Responder) -> Self {
        Self {
            epoch,
            request_ids: Vec::new(),
            run_id: None,
            responder: Some(responder),
        }
    }

    /// Deliver `result` if nothing has been delivered yet.
    ///
    /// Returns whether this call delivered.
    pub fn resolve(&mut self, result: Result<String, ClientError>) -> bool {
        match self.responder.take() {
            Some(responder) => {
                // The caller may have stopped waiting; that still counts.
                let _ = responder.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.responder.is_none()
    }

    pub fn owns_request(&self, id: &str) -> bool {
        self.request_ids.iter().any(|r| r == id)
    }
}

/// Mutable connection and request state.
#[derive(Debug, Default)]
pub(crate) struct ConnectionState {
    pub phase: SessionState,
    pub authenticated: bool,
    /// Bumped on every connect and teardown. Transport events carry the
    /// generation they were opened under.
    pub generation: u64,
    pub outbound: Option<mpsc::UnboundedSender<Outbound>>,
    pub pending_challenge: Option<Challenge>,

    /// Bumped on every `send_message` / `reset_session`.
    pub epoch: u64,
    pub in_flight: Option<InFlight>,
    /// Chat text waiting for the handshake to finish.
    pub pending_message: Option<String>,
    /// Id of the outstanding `sessions.reset` request.
    pub pending_reset_id: Option<String>,
    /// A reset was requested before the handshake finished.
    pub reset_after_connect: bool,
    pub response_buffer: String,
    retired_ids: VecDeque<String>,
    retired_runs: VecDeque<String>,
}

impl ConnectionState {
    /// Replace the in-flight operation with a new one. The previous
    /// operation's responder is dropped without being called and its request
    /// ids and run are retired.
    pub fn begin_operation(&mut self, responder: Responder) {
        self.epoch += 1;
        if let Some(previous) = self.in_flight.take() {
            for id in previous.request_ids {
                self.retire(id);
            }
            if let Some(run_id) = previous.run_id {
                bounded_push(&mut self.retired_runs, run_id);
            }
        }
        if let Some(reset_id) = self.pending_reset_id.take() {
            self.retire(reset_id);
        }
        self.in_flight = Some(InFlight::new(self.epoch, responder));
        self.response_buffer.clear();
        self.pending_message = None;
        self.reset_after_connect = false;
    }

    /// Record a request id as sent for the current operation.
    pub fn track_request(&mut self, id: &str) {
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.request_ids.push(id.to_string());
        }
    }

    /// Resolve the current operation, at most once.
    pub fn resolve(&mut self, result: Result<String, ClientError>) -> bool {
        let delivered = self
            .in_flight
            .as_mut()
            .is_some_and(|in_flight| in_flight.resolve(result));
        if delivered {
            self.response_buffer.clear();
        }
        delivered
    }

    /// Whether the current operation is still waiting for a result.
    pub fn awaiting_result(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| !in_flight.is_resolved())
    }

    /// Run id of the current operation, if the gateway assigned one.
    pub fn run_id(&self) -> Option<&str> {
        self.in_flight.as_ref().and_then(|f| f.run_id.as_deref())
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired_ids.iter().any(|r| r == id)
    }

    /// Whether `run_id` belongs to a superseded operation.
    pub fn is_retired_run(&self, run_id: &str) -> bool {
        self.retired_runs.iter().any(|r| r == run_id)
    }

    fn retire(&mut self, id: String) {
        bounded_push(&mut self.retired_ids, id);
    }

    /// Forget the current transport: bump the generation and clear
    /// everything tied to the connection.
    pub fn drop_connection(&mut self) -> Option<mpsc::UnboundedSender<Outbound>> {
        self.generation += 1;
        self.authenticated = false;
        self.pending_challenge = None;
        self.pending_reset_id = None;
        self.reset_after_connect = false;
        self.outbound.take()
    }
}

fn bounded_push(ids: &mut VecDeque<String>, id: String) {
    if ids.len() == RETIRED_IDS {
        ids.pop_front();
    }
    ids.push_back(id);
}
