//! Gateway wire protocol.
//!
//! Every frame is a JSON text message with a `type` of `req`, `res` or
//! `event`. The client only sends `req` frames and only acts on `res` and
//! `event` frames.

use crate::methods::{self, events};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version announced as both minimum and maximum.
pub const PROTOCOL_VERSION: u32 = 3;

/// Role requested in the handshake.
pub const ROLE: &str = "operator";

/// Scopes requested in the handshake.
pub const SCOPES: [&str; 2] = ["operator.read", "operator.write"];

/// Outbound request frame.
#[derive(Debug, Clone, Serialize)]
pub struct RequestFrame<P> {
    #[serde(rename = "type")]
    frame_type: &'static str,

    /// Correlation id echoed by the matching response.
    pub id: String,

    /// Method name.
    pub method: &'static str,

    /// Method parameters.
    pub params: P,
}

impl<P: Serialize> RequestFrame<P> {
    /// Create a request with a fresh random id.
    pub fn new(method: &'static str, params: P) -> Self {
        Self {
            frame_type: "req",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        }
    }

    /// Set the request id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Encode as a text frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parameters for `connect`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: String,
    pub scopes: Vec<String>,
    pub auth: AuthParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceParams>,
    pub locale: String,
    pub user_agent: String,
}

/// Client metadata block of `connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

/// Bearer auth block of `connect`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthParams {
    pub token: String,
}

/// Signed device proof of `connect`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceParams {
    pub id: String,
    pub public_key: String,
    pub signature: String,
    pub signed_at: i64,
    pub nonce: String,
}

/// Parameters for `chat.send`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendParams {
    pub message: String,
    pub session_key: String,
    /// Always equal to the request id.
    pub idempotency_key: String,
}

/// Parameters for `sessions.reset`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionsResetParams {
    pub key: String,
}

/// Fields covered by the device signature.
///
/// The canonical form joins the fields with `|` in this exact order:
/// `v2|deviceId|clientId|clientMode|role|scopes|signedAtMs|token|nonce`,
/// with the scopes comma-joined. Without a nonce the version is `v1` and the
/// trailing nonce field is omitted.
#[derive(Debug, Clone)]
pub struct DeviceAuthPayload<'a> {
    pub device_id: &'a str,
    pub client_id: &'a str,
    pub client_mode: &'a str,
    pub role: &'a str,
    pub scopes: &'a [&'a str],
    pub signed_at_ms: i64,
    pub token: &'a str,
    pub nonce: Option<&'a str>,
}

impl DeviceAuthPayload<'_> {
    /// Build the exact string that gets signed.
    pub fn canonical(&self) -> String {
        let version = if self.nonce.is_some() { "v2" } else { "v1" };
        let scopes = self.scopes.join(",");
        let signed_at = self.signed_at_ms.to_string();
        let mut fields = vec![
            version,
            self.device_id,
            self.client_id,
            self.client_mode,
            self.role,
            &scopes,
            &signed_at,
            self.token,
        ];
        if let Some(nonce) = self.nonce {
            fields.push(nonce);
        }
        fields.join("|")
    }
}

/// Inbound frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "res")]
    Response(ResponseFrame),

    #[serde(rename = "event")]
    Event(EventFrame),

    /// Requests from the gateway and unknown frame types.
    #[serde(other)]
    Unknown,
}

impl Frame {
    /// Parse a text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Inbound `res` frame.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseFrame {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub ok: Option<bool>,

    #[serde(default)]
    pub payload: Option<Value>,

    #[serde(default)]
    pub error: Option<Value>,
}

impl ResponseFrame {
    /// Whether this is the successful handshake acknowledgment.
    pub fn is_hello_ok(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| str_at(p, "type"))
            .is_some_and(|t| t == methods::HELLO_OK)
    }

    /// Device token issued on pairing, if present and non-empty.
    pub fn device_token(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("auth"))
            .and_then(|auth| str_at(auth, "deviceToken"))
            .filter(|token| !token.is_empty())
    }

    /// Run id assigned to an accepted `chat.send`.
    pub fn run_id(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| str_at(p, "runId"))
            .filter(|id| !id.is_empty())
    }

    /// Failure message.
    ///
    /// Uses `error.message` when present. `with_error` is used when an error
    /// object exists without a message, `without_error` when there is no
    /// error object at all.
    pub fn error_message(&self, with_error: &str, without_error: &str) -> String {
        match self.error.as_ref().filter(|e| e.is_object()) {
            Some(error) => str_at(error, "message").unwrap_or(with_error).to_string(),
            None => without_error.to_string(),
        }
    }
}

/// Inbound `event` frame.
#[derive(Debug, Default, Deserialize)]
pub struct EventFrame {
    #[serde(default)]
    pub event: String,

    #[serde(default)]
    pub payload: Option<Value>,
}

/// An inbound event, classified by what the session does with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Handshake challenge to be signed.
    Challenge { nonce: String, ts: Option<i64> },

    /// `health` / `tick` liveness events.
    Heartbeat,

    /// A fragment of the assistant's streamed reply.
    AssistantDelta {
        run_id: Option<String>,
        delta: String,
    },

    /// The agent run finished.
    LifecycleEnd { run_id: Option<String> },

    /// A complete, non-streamed final reply. `None` when the message carried
    /// no usable text block.
    ChatFinal { text: Option<String> },

    /// Anything else, by event name.
    Other(String),
}

impl EventFrame {
    /// Classify the event.
    pub fn classify(self) -> GatewayEvent {
        let Some(payload) = self.payload else {
            return match self.event.as_str() {
                events::HEALTH | events::TICK => GatewayEvent::Heartbeat,
                _ => GatewayEvent::Other(self.event),
            };
        };

        match self.event.as_str() {
            events::CONNECT_CHALLENGE => GatewayEvent::Challenge {
                nonce: str_at(&payload, "nonce").unwrap_or_default().to_string(),
                ts: payload.get("ts").and_then(Value::as_i64),
            },
            events::HEALTH | events::TICK => GatewayEvent::Heartbeat,
            events::AGENT => classify_agent(&payload).unwrap_or(GatewayEvent::Other(self.event)),
            events::CHAT if str_at(&payload, "state") == Some("final") => GatewayEvent::ChatFinal {
                text: final_text(&payload),
            },
            _ => GatewayEvent::Other(self.event),
        }
    }
}

fn classify_agent(payload: &Value) -> Option<GatewayEvent> {
    let run_id = str_at(payload, "runId").map(str::to_string);
    let data = payload.get("data").filter(|d| d.is_object())?;

    match str_at(payload, "stream")? {
        "assistant" => Some(GatewayEvent::AssistantDelta {
            run_id,
            delta: str_at(data, "delta").unwrap_or_default().to_string(),
        }),
        "lifecycle" if str_at(data, "phase") == Some("end") => {
            Some(GatewayEvent::LifecycleEnd { run_id })
        }
        _ => None,
    }
}

/// Text of the first content block, if it is a non-empty text block.
fn final_text(payload: &Value) -> Option<String> {
    let first = payload
        .get("message")?
        .get("content")?
        .as_array()?
        .first()?;
    if str_at(first, "type") != Some("text") {
        return None;
    }
    str_at(first, "text")
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}
