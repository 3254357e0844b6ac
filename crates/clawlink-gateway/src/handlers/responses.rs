//! Responses to our own requests.

use std::sync::atomic::Ordering;

use tracing::{debug, info};

use crate::client::SessionActor;
use crate::error::ClientError;
use crate::protocol::ResponseFrame;
use crate::session::SessionState;

const RESET_FAILED: &str = "Reset failed";
const GENERIC_ERROR: &str = "Error";
const GENERIC_FAILURE: &str = "Failed";

impl SessionActor {
    pub(crate) fn handle_response(&mut self, response: ResponseFrame) {
        if response.is_hello_ok() {
            self.on_hello_ok(&response);
            return;
        }

        let id = response.id.as_deref();

        if id.is_some() && id == self.state.pending_reset_id.as_deref() {
            self.state.pending_reset_id = None;
            // A reset ack without an explicit `ok` is a failure.
            let result = if response.ok.unwrap_or(false) {
                Ok(self.options.client.reset_confirmation.clone())
            } else {
                Err(ClientError::Gateway(
                    response.error_message(RESET_FAILED, RESET_FAILED),
                ))
            };
            debug!(success = result.is_ok(), "reset acknowledged");
            self.state.resolve(result);
            return;
        }

        if !response.ok.unwrap_or(true) {
            if let Some(id) = id.filter(|id| self.state.is_retired(id)) {
                debug!(id, "ignoring failure for superseded request");
                return;
            }
            let message = response.error_message(GENERIC_ERROR, GENERIC_FAILURE);
            debug!(id, %message, "gateway reported failure");
            self.state.resolve(Err(ClientError::Gateway(message)));
            return;
        }

        if let (Some(id), Some(run_id)) = (id, response.run_id()) {
            if let Some(in_flight) = self.state.in_flight.as_mut() {
                if in_flight.owns_request(id) {
                    debug!(id, run_id, "chat accepted");
                    in_flight.run_id = Some(run_id.to_string());
                }
            }
        }
    }

    fn on_hello_ok(&mut self, response: &ResponseFrame) {
        self.state.authenticated = true;
        self.set_phase(SessionState::Ready);

        let paired = response.device_token().is_some();
        if paired {
            self.paired.store(true, Ordering::Release);
        }
        info!(paired, "authenticated with gateway");

        if self.state.reset_after_connect {
            self.state.reset_after_connect = false;
            self.state.pending_message = None;
            self.send_reset();
        } else if let Some(text) = self.state.pending_message.take() {
            self.send_chat(text);
        }
    }
}
