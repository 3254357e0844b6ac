//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back into gateway client options.

use clawlink_core::config::Config;
use clawlink_gateway::ClientOptions;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clawlink.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.url, config.gateway.url);
    assert_eq!(loaded.session.key, config.session.key);
    assert_eq!(loaded.client.reset_confirmation, config.client.reset_confirmation);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clawlink.json5");

    let mut config = Config::default();
    config.gateway.url = "https://gw.example.com/".to_string();
    config.gateway.token = "file-token".into();
    config.gateway.connect_timeout_secs = 5;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.token.expose_secret(), "file-token");
    assert_eq!(loaded.gateway.connect_timeout_secs, 5);
}

#[test]
fn test_handwritten_json5_to_client_options() {
    let config = Config::parse(
        r#"{
            // trailing commas and comments are fine
            gateway: { url: "http://10.0.0.5:18789/", writeTimeoutSecs: 10, },
            session: { key: "agent:main:desk" },
            client: { resetConfirmation: "Fresh start" },
        }"#,
    )
    .unwrap();
    config.validate().unwrap();

    let options = ClientOptions::from_config(&config).unwrap();
    assert_eq!(options.url, "ws://10.0.0.5:18789");
    assert_eq!(options.write_timeout, Duration::from_secs(10));
    assert_eq!(options.connect_timeout, Duration::from_secs(30));
    assert_eq!(options.session_key, "agent:main:desk");
    assert_eq!(options.client.reset_confirmation, "Fresh start");
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::parse(r#"{ gateway: { url: "ftp://nope", connectTimeoutSecs: 0 } }"#).unwrap();
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("; "), "expected every problem reported, got: {}", err);
}
