//! Inbound frame handlers for the session actor.

mod events;
mod responses;

use tracing::{trace, warn};

use crate::client::SessionActor;
use crate::protocol::Frame;

impl SessionActor {
    /// Dispatch one inbound text frame.
    pub(crate) fn handle_text(&mut self, text: &str) {
        match Frame::parse(text) {
            Ok(Frame::Response(response)) => self.handle_response(response),
            Ok(Frame::Event(event)) => self.handle_event(event.classify()),
            Ok(Frame::Unknown) => trace!("ignoring frame of unhandled type"),
            Err(e) => warn!(error = %e, len = text.len(), "dropping malformed frame"),
        }
    }
}
