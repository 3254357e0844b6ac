//! # clawlink-core
//!
//! Configuration and shared utilities for the clawlink gateway client.
//!
//! - **Configuration**: JSON5 config file, environment overrides, validation
//! - **Paths**: resolution of the `~/.clawlink` layout
//! - **Secrets**: [`SecretString`] for the gateway bearer token

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use secret::SecretString;
