//! Configuration schema definitions.

use crate::error::ConfigError;
use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:18789";

/// Default session key for this client class.
pub const DEFAULT_SESSION_KEY: &str = "agent:main:clawlink:cli";

/// Main clawlink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Client metadata sent in the connect request.
    #[serde(default)]
    pub client: ClientInfoConfig,

    /// Conversation session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Device identity storage.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Gateway URL. `http(s)://` is accepted and rewritten to `ws(s)://`.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Bearer token presented in the connect request.
    #[serde(default)]
    pub token: SecretString,

    /// Bound on the websocket handshake.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Bound on each outbound frame write.
    #[serde(default = "default_timeout_secs")]
    pub write_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token: SecretString::default(),
            connect_timeout_secs: default_timeout_secs(),
            write_timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// The configured URL in websocket form.
    pub fn normalized_url(&self) -> Result<String, ConfigError> {
        normalize_gateway_url(&self.url)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Client metadata announced to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfoConfig {
    /// Client id (also part of the signed device payload).
    #[serde(default = "default_client_id")]
    pub id: String,

    /// Client version.
    #[serde(default = "default_client_version")]
    pub version: String,

    /// Platform name.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Client mode (also part of the signed device payload).
    #[serde(default = "default_client_id")]
    pub mode: String,

    /// Locale reported to the gateway.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// User agent reported to the gateway.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Text delivered to the caller when a session reset succeeds.
    #[serde(default = "default_reset_confirmation")]
    pub reset_confirmation: String,
}

impl Default for ClientInfoConfig {
    fn default() -> Self {
        Self {
            id: default_client_id(),
            version: default_client_version(),
            platform: default_platform(),
            mode: default_client_id(),
            locale: default_locale(),
            user_agent: default_user_agent(),
            reset_confirmation: default_reset_confirmation(),
        }
    }
}

fn default_client_id() -> String {
    "cli".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_user_agent() -> String {
    format!("clawlink/{}", env!("CARGO_PKG_VERSION"))
}

fn default_reset_confirmation() -> String {
    "Conversation reset".to_string()
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session key naming the logical conversation on the gateway.
    #[serde(default = "default_session_key")]
    pub key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_session_key(),
        }
    }
}

fn default_session_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

/// Device identity storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Directory holding the persisted keypair. Defaults to `~/.clawlink/identity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl IdentityConfig {
    /// Resolve the identity directory, expanding `~`.
    pub fn resolve_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.dir {
            Some(dir) => Ok(crate::paths::expand_tilde(&dir.to_string_lossy())),
            None => crate::paths::identity_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "clawlink=info".to_string()
}

/// Normalize a gateway URL to its websocket form.
///
/// `https://` becomes `wss://`, `http://` becomes `ws://`, and one trailing
/// slash is stripped. The result must be a `ws` or `wss` URL with a host.
pub fn normalize_gateway_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    let rewritten = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    };
    let normalized = rewritten
        .strip_suffix('/')
        .map(str::to_string)
        .unwrap_or(rewritten);

    let parsed = url::Url::parse(&normalized).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(invalid("scheme must be ws, wss, http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rewrites_http_schemes() {
        assert_eq!(
            normalize_gateway_url("https://gw.example.com/").unwrap(),
            "wss://gw.example.com"
        );
        assert_eq!(
            normalize_gateway_url("http://10.0.0.2:18789").unwrap(),
            "ws://10.0.0.2:18789"
        );
    }

    #[test]
    fn test_normalize_keeps_ws_and_path() {
        assert_eq!(
            normalize_gateway_url("wss://gw.example.com/ws/").unwrap(),
            "wss://gw.example.com/ws"
        );
        assert_eq!(
            normalize_gateway_url("ws://localhost:18789").unwrap(),
            "ws://localhost:18789"
        );
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(normalize_gateway_url("ftp://gw.example.com").is_err());
        assert!(normalize_gateway_url("not a url").is_err());
        assert!(normalize_gateway_url("").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.gateway.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.client.id, "cli");
        assert_eq!(config.client.mode, "cli");
        assert_eq!(config.session.key, DEFAULT_SESSION_KEY);
        assert!(config.gateway.token.is_empty());
    }

    #[test]
    fn test_identity_dir_override() {
        let identity = IdentityConfig {
            dir: Some(PathBuf::from("/tmp/clawlink-id")),
        };
        assert_eq!(identity.resolve_dir().unwrap(), PathBuf::from("/tmp/clawlink-id"));
    }
}
