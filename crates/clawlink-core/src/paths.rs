//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the clawlink base directory (~/.clawlink).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".clawlink"))
}

/// Get the main config file path (~/.clawlink/clawlink.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("clawlink.json5"))
}

/// Get the device identity directory (~/.clawlink/identity).
pub fn identity_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("identity"))
}

/// Get the interactive chat history file (~/.clawlink/history.txt).
pub fn history_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("history.txt"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
