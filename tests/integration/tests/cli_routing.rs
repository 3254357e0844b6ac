//! CLI binary integration tests.
//!
//! These tests exercise the compiled `clawlink` binary to verify command
//! routing, help text, identity persistence, and a one-shot send against the
//! mock gateway.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use clawlink_integration_tests::{echo, MockGateway};
use tempfile::TempDir;

/// The debug build of the `clawlink` binary.
///
/// This crate lives two levels below the workspace root, and cargo builds
/// every member into the shared `target/` there.
fn clawlink_bin() -> PathBuf {
    let bin = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/debug/clawlink");
    assert!(
        bin.exists(),
        "no clawlink binary at {}; build clawlink-cli before running these tests",
        bin.display()
    );
    bin
}

/// A command isolated from the caller's environment and home directory.
fn clawlink_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(clawlink_bin());
    cmd.env("HOME", home)
        .env_remove("CLAWLINK_CONFIG")
        .env_remove("CLAWLINK_GATEWAY_URL")
        .env_remove("CLAWLINK_AUTH_TOKEN")
        .env_remove("CLAWLINK_SESSION_KEY")
        .env_remove("CLAWLINK_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = clawlink_cmd(home.path())
        .arg("version")
        .output()
        .expect("failed to run clawlink");
    assert!(output.status.success(), "version command should succeed");
    assert!(
        stdout(&output).contains("clawlink"),
        "version output should contain 'clawlink', got: {}",
        stdout(&output)
    );
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = clawlink_cmd(home.path())
        .arg("--help")
        .output()
        .expect("failed to run clawlink");
    assert!(output.status.success(), "--help should succeed");
    let text = stdout(&output);
    for command in ["send", "reset", "chat", "identity"] {
        assert!(
            text.contains(command),
            "help output should mention '{}', got: {}",
            command,
            text
        );
    }
}

#[test]
fn test_cli_unknown_command() {
    let home = TempDir::new().unwrap();
    let output = clawlink_cmd(home.path())
        .arg("nonexistent-command")
        .output()
        .expect("failed to run clawlink");
    assert!(
        !output.status.success(),
        "unknown command should return non-zero exit code"
    );
}

#[test]
fn test_cli_identity_is_stable() {
    let home = TempDir::new().unwrap();
    let run = || {
        let output = clawlink_cmd(home.path())
            .args(["identity", "--json"])
            .output()
            .expect("failed to run clawlink identity");
        assert!(output.status.success(), "identity should succeed");
        serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first["deviceId"], second["deviceId"]);
    assert_eq!(first["deviceId"].as_str().unwrap().len(), 64);
    assert!(home.path().join(".clawlink/identity/device-identity").exists());
}

#[test]
fn test_cli_config_show_redacts_token() {
    let home = TempDir::new().unwrap();
    let output = clawlink_cmd(home.path())
        .args(["config", "show", "--token", "very-secret-token"])
        .output()
        .expect("failed to run clawlink config show");
    assert!(output.status.success(), "config show should succeed");
    let text = stdout(&output);
    assert!(!text.contains("very-secret-token"));
    assert!(text.contains("<17 chars>"), "got: {}", text);
}

#[test]
fn test_cli_send_unreachable_gateway_fails() {
    let home = TempDir::new().unwrap();
    let output = clawlink_cmd(home.path())
        .args(["send", "hi", "--url", "ws://127.0.0.1:1"])
        .output()
        .expect("failed to run clawlink send");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Connection failed"), "got: {}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_send_against_gateway() {
    let gateway = MockGateway::start("cli-token").await;
    let home = TempDir::new().unwrap();
    let mut cmd = clawlink_cmd(home.path());
    cmd.args(["send", "hola", "--url", gateway.url(), "--token", "cli-token"]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .expect("failed to run clawlink send");
    assert!(
        output.status.success(),
        "send should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).trim(), echo("hola"));
    assert_eq!(gateway.connections(), 1);
}
