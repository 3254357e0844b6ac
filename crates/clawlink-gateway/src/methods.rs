//! Gateway method and event names.

/// Handshake request carrying client metadata, auth token and device proof.
pub const CONNECT: &str = "connect";

/// Send a user message to the agent.
pub const CHAT_SEND: &str = "chat.send";

/// Start a fresh gateway-side session under the same session key.
pub const SESSIONS_RESET: &str = "sessions.reset";

/// Server-initiated event names.
pub mod events {
    pub const CONNECT_CHALLENGE: &str = "connect.challenge";
    pub const HEALTH: &str = "health";
    pub const TICK: &str = "tick";
    pub const AGENT: &str = "agent";
    pub const CHAT: &str = "chat";
}

/// Response payload type acknowledging a successful handshake.
pub const HELLO_OK: &str = "hello-ok";
