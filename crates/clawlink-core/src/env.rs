//! Environment variable handling.

use std::env;

/// Environment variable names understood by clawlink.
pub mod vars {
    pub const GATEWAY_URL: &str = "CLAWLINK_GATEWAY_URL";
    pub const AUTH_TOKEN: &str = "CLAWLINK_AUTH_TOKEN";
    pub const SESSION_KEY: &str = "CLAWLINK_SESSION_KEY";
    pub const LOG: &str = "CLAWLINK_LOG";
    pub const CONFIG: &str = "CLAWLINK_CONFIG";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
