//! Gateway session tests over real websockets.
//!
//! These drive `GatewayClient` with the default `WsConnector` against the
//! in-process mock gateway.

use std::sync::Arc;

use clawlink_gateway::{ClientError, ClientOptions, GatewayClient, SessionState};
use clawlink_identity::{DeviceIdentity, FileKeyStore};
use clawlink_integration_tests::{echo, MockGateway, WAIT};
use tempfile::TempDir;

const TOKEN: &str = "gateway-token";

struct Setup {
    gateway: MockGateway,
    client: GatewayClient,
    _identity_dir: TempDir,
}

async fn setup_with(url_for: impl FnOnce(&str) -> String, token: &str) -> Setup {
    let gateway = MockGateway::start(TOKEN).await;
    let identity_dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(identity_dir.path().join("identity"));
    let identity = DeviceIdentity::ensure(&store).unwrap();

    let options = ClientOptions::new(&url_for(gateway.url()))
        .unwrap()
        .with_token(token)
        .with_session_key("agent:main:integration");
    let client = GatewayClient::new(options, Arc::new(identity));

    Setup {
        gateway,
        client,
        _identity_dir: identity_dir,
    }
}

async fn setup() -> Setup {
    setup_with(|url| url.to_string(), TOKEN).await
}

async fn wait_for_state(client: &GatewayClient, state: SessionState) {
    let mut states = client.state_changes();
    tokio::time::timeout(WAIT, states.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .expect("client stopped");
}

#[tokio::test]
async fn test_chat_round_trip() {
    let mut s = setup().await;

    let reply = s.client.chat("hola mundo").await.unwrap();
    assert_eq!(reply, echo("hola mundo"));
    assert!(s.client.is_paired());
    assert_eq!(s.client.state(), SessionState::Ready);

    let connect = s.gateway.next_request().await;
    assert_eq!(connect["method"], "connect");
    assert_eq!(connect["params"]["device"]["nonce"], "nonce-1");

    let chat = s.gateway.next_request().await;
    assert_eq!(chat["method"], "chat.send");
    assert_eq!(chat["params"]["sessionKey"], "agent:main:integration");
    assert_eq!(chat["params"]["idempotencyKey"], chat["id"]);
}

#[tokio::test]
async fn test_ready_session_reuses_connection() {
    let mut s = setup().await;

    assert_eq!(s.client.chat("one").await.unwrap(), echo("one"));
    assert_eq!(s.client.chat("two").await.unwrap(), echo("two"));

    assert_eq!(s.gateway.connections(), 1);
    assert_eq!(
        s.gateway.drain_methods(),
        vec!["connect", "chat.send", "chat.send"]
    );
}

#[tokio::test]
async fn test_reset_sends_only_reset() {
    let mut s = setup().await;

    let confirmation = s.client.reset().await.unwrap();
    assert_eq!(confirmation, "Conversation reset");
    assert_eq!(s.gateway.drain_methods(), vec!["connect", "sessions.reset"]);
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let s = setup_with(|url| url.to_string(), "wrong-token").await;

    let result = s.client.chat("hi").await;
    assert_eq!(result, Err(ClientError::Gateway("unauthorized".into())));
    assert!(!s.client.is_paired());
}

#[tokio::test]
async fn test_final_message_fallback() {
    let s = setup().await;
    assert_eq!(s.client.chat("final").await.unwrap(), "final answer");
}

#[tokio::test]
async fn test_gateway_error_surfaces() {
    let s = setup().await;
    assert_eq!(
        s.client.chat("fail").await,
        Err(ClientError::Gateway("boom".into()))
    );
}

#[tokio::test]
async fn test_disconnect_then_send_reconnects() {
    let s = setup().await;
    s.client.chat("first").await.unwrap();

    s.client.disconnect();
    wait_for_state(&s.client, SessionState::Disconnected).await;

    assert_eq!(s.client.chat("second").await.unwrap(), echo("second"));
    assert_eq!(s.gateway.connections(), 2);
}

#[tokio::test]
async fn test_server_close_leaves_request_pending_until_superseded() {
    let s = setup().await;
    s.client.chat("warm up").await.unwrap();

    let client = s.client.clone();
    let pending = tokio::spawn(async move { client.chat("close").await });
    wait_for_state(&s.client, SessionState::Disconnected).await;
    assert!(!pending.is_finished());

    assert_eq!(s.client.chat("again").await.unwrap(), echo("again"));
    assert_eq!(pending.await.unwrap(), Err(ClientError::Superseded));
    assert_eq!(s.gateway.connections(), 2);
}

#[tokio::test]
async fn test_http_url_is_normalized() {
    let s = setup_with(|url| format!("{}/", url.replacen("ws://", "http://", 1)), TOKEN).await;
    assert_eq!(s.client.chat("hi").await.unwrap(), echo("hi"));
}

#[tokio::test]
async fn test_unreachable_gateway() {
    let identity = Arc::new(DeviceIdentity::generate().unwrap());
    let options = ClientOptions::new("ws://127.0.0.1:1").unwrap();
    let client = GatewayClient::new(options, identity);

    let result = client.chat("hi").await;
    assert!(matches!(result, Err(ClientError::ConnectionFailed(_))));
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_callback_api() {
    let s = setup().await;
    let (tx, rx) = tokio::sync::oneshot::channel();
    s.client.send_message("callback", move |result| {
        let _ = tx.send(result);
    });

    let result = tokio::time::timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(result, Ok(echo("callback")));
}
