//! Server-initiated events: handshake challenge and reply streaming.

use chrono::Utc;
use tracing::{debug, error, trace};

use crate::client::SessionActor;
use crate::methods;
use crate::protocol::{
    AuthParams, ClientInfo, ConnectParams, DeviceAuthPayload, DeviceParams, GatewayEvent,
    RequestFrame, PROTOCOL_VERSION, ROLE, SCOPES,
};
use crate::session::{Challenge, SessionState};

impl SessionActor {
    pub(crate) fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Heartbeat => {}
            GatewayEvent::Challenge { nonce, ts } => {
                if self.state.authenticated {
                    debug!("ignoring challenge on authenticated connection");
                    return;
                }
                self.state.pending_challenge = Some(Challenge { nonce, ts });
                self.send_connect();
            }
            event if !self.state.authenticated => {
                trace!(?event, "ignoring event before authentication");
            }
            GatewayEvent::AssistantDelta { run_id, delta } => {
                if delta.is_empty() || !self.accepts_run(run_id.as_deref()) {
                    return;
                }
                self.state.response_buffer.push_str(&delta);
            }
            GatewayEvent::LifecycleEnd { run_id } => {
                if !self.accepts_run(run_id.as_deref()) {
                    return;
                }
                let text = self.state.response_buffer.trim().to_string();
                if text.is_empty() {
                    debug!("run ended without streamed text");
                    return;
                }
                if self.state.resolve(Ok(text)) {
                    debug!("streamed reply delivered");
                }
            }
            GatewayEvent::ChatFinal { text } => {
                if !self.state.response_buffer.is_empty() {
                    debug!("ignoring final chat message, reply already streaming");
                    return;
                }
                if let Some(text) = text {
                    if self.state.resolve(Ok(text)) {
                        debug!("final chat message delivered");
                    }
                }
            }
            GatewayEvent::Other(name) => trace!(event = %name, "ignoring event"),
        }
    }

    /// Whether agent events for `run_id` belong to the in-flight request.
    /// Until the gateway has named our run, only runs of superseded
    /// operations are refused.
    fn accepts_run(&self, run_id: Option<&str>) -> bool {
        if !self.state.awaiting_result() {
            return false;
        }
        match (self.state.run_id(), run_id) {
            (Some(ours), Some(theirs)) => ours == theirs,
            (None, Some(theirs)) => !self.state.is_retired_run(theirs),
            _ => true,
        }
    }

    /// Answer the pending challenge with a signed `connect` request.
    fn send_connect(&mut self) {
        let nonce = match self.state.pending_challenge.take() {
            Some(challenge) => {
                trace!(issued_at = ?challenge.ts, "signing challenge");
                Some(challenge.nonce).filter(|nonce| !nonce.is_empty())
            }
            None => None,
        };

        let client = &self.options.client;
        let token = self.options.token.expose_secret();

        let device = nonce.map(|nonce| {
            let signed_at = Utc::now().timestamp_millis();
            let payload = DeviceAuthPayload {
                device_id: self.identity.device_id(),
                client_id: &client.id,
                client_mode: &client.mode,
                role: ROLE,
                scopes: &SCOPES,
                signed_at_ms: signed_at,
                token,
                nonce: Some(&nonce),
            };
            let signature = self.identity.sign_base64url(payload.canonical().as_bytes());
            DeviceParams {
                id: self.identity.device_id().to_string(),
                public_key: self.identity.public_key_base64url(),
                signature,
                signed_at,
                nonce,
            }
        });

        let frame = RequestFrame::new(
            methods::CONNECT,
            ConnectParams {
                min_protocol: PROTOCOL_VERSION,
                max_protocol: PROTOCOL_VERSION,
                client: ClientInfo {
                    id: client.id.clone(),
                    version: client.version.clone(),
                    platform: client.platform.clone(),
                    mode: client.mode.clone(),
                },
                role: ROLE.to_string(),
                scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
                auth: AuthParams {
                    token: token.to_string(),
                },
                device,
                locale: client.locale.clone(),
                user_agent: client.user_agent.clone(),
            },
        );

        debug!(
            device_id = self.identity.short_id(),
            signed = frame.params.device.is_some(),
            "answering challenge"
        );
        match self.send_frame(&frame) {
            Ok(()) => self.set_phase(SessionState::Authenticating),
            Err(e) => {
                error!(error = %e, "failed to send connect request");
                self.state.resolve(Err(e));
            }
        }
    }
}
