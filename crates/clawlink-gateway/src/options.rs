//! Client options resolved from configuration.

use std::time::Duration;

use clawlink_core::config::ClientInfoConfig;
use clawlink_core::{Config, ConfigError, SecretString};

/// Everything the session needs to connect and authenticate.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Websocket URL, already normalized.
    pub url: String,
    pub token: SecretString,
    pub session_key: String,
    pub client: ClientInfoConfig,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl ClientOptions {
    /// Options for `url` with every other setting at its default.
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.gateway.url = url.to_string();
        Self::from_config(&config)
    }

    /// Resolve options from a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.gateway.normalized_url()?,
            token: config.gateway.token.clone(),
            session_key: config.session.key.clone(),
            client: config.client.clone(),
            connect_timeout: config.gateway.connect_timeout(),
            write_timeout: config.gateway.write_timeout(),
        })
    }

    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }
}
