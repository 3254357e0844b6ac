//! Configuration loading and persistence.

use super::{normalize_gateway_url, Config};
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded config file");
        Self::parse(&content)
    }

    /// Load from `path` (or the default path), falling back to defaults when
    /// the file does not exist. Parse errors are still reported.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let result = match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        };
        match result {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(missing)) => {
                debug!(path = %missing.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `CLAWLINK_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(url) = env::get_var(vars::GATEWAY_URL) {
            self.gateway.url = url;
        }
        if let Some(token) = env::get_var(vars::AUTH_TOKEN) {
            self.gateway.token = SecretString::new(token);
        }
        if let Some(key) = env::get_var(vars::SESSION_KEY) {
            self.session.key = key;
        }
        if let Some(level) = env::get_var(vars::LOG) {
            self.logging.level = level;
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Gateway URL must normalize to ws/wss
        if self.gateway.url.trim().is_empty() {
            errors.push("Gateway URL must not be empty".to_string());
        } else if let Err(e) = normalize_gateway_url(&self.gateway.url) {
            errors.push(e.to_string());
        }

        // 2. Timeouts
        if self.gateway.connect_timeout_secs == 0 {
            errors.push("Gateway connect timeout must be greater than 0".to_string());
        }
        if self.gateway.write_timeout_secs == 0 {
            errors.push("Gateway write timeout must be greater than 0".to_string());
        }

        // 3. Values that end up in the signed device payload
        if self.client.id.trim().is_empty() {
            errors.push("Client id must not be empty".to_string());
        }
        if self.client.mode.trim().is_empty() {
            errors.push("Client mode must not be empty".to_string());
        }
        if self.client.id.contains('|') || self.client.mode.contains('|') {
            errors.push("Client id and mode must not contain '|'".to_string());
        }

        // 4. Session key
        if self.session.key.trim().is_empty() {
            errors.push("Session key must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
