//! CLI command implementations.

pub mod chat;
pub mod config;
pub mod identity;
pub mod reset;
pub mod send;
