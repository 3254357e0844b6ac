//! Shared fixtures for the integration tests.
//!
//! [`MockGateway`] is a small in-process websocket server speaking the
//! gateway protocol. It checks the signed handshake and answers chat
//! messages with a streamed echo. A few magic messages change its behavior:
//!
//! - `close`: the server closes the connection without answering
//! - `fail`: the request is rejected with `boom`
//! - `final`: the answer arrives as one final chat message, not streamed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use clawlink_gateway::protocol::DeviceAuthPayload;
use clawlink_identity::derive_device_id;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// How long fixtures wait before failing a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Reply text the mock streams for `message`.
pub fn echo(message: &str) -> String {
    format!("echo: {message}")
}

pub struct MockGateway {
    url: String,
    connections: Arc<AtomicUsize>,
    requests: mpsc::UnboundedReceiver<Value>,
}

impl MockGateway {
    /// Start a gateway on an ephemeral port accepting `token`.
    pub async fn start(token: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let (requests_tx, requests) = mpsc::unbounded_channel();

        let counter = connections.clone();
        let token = token.to_string();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(serve(stream, n, token.clone(), requests_tx.clone()));
            }
        });

        Self {
            url,
            connections,
            requests,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of websocket connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next request frame any client sent.
    pub async fn next_request(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.requests.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("gateway stopped")
    }

    /// Methods of all requests received and not yet consumed.
    pub fn drain_methods(&mut self) -> Vec<String> {
        let mut methods = Vec::new();
        while let Ok(request) = self.requests.try_recv() {
            methods.push(request["method"].as_str().unwrap_or_default().to_string());
        }
        methods
    }
}

type Sink = futures::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

async fn send(sink: &mut Sink, frame: Value) {
    let _ = sink.send(Message::Text(frame.to_string())).await;
}

async fn serve(stream: TcpStream, n: usize, token: String, requests: mpsc::UnboundedSender<Value>) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();
    let nonce = format!("nonce-{n}");
    send(
        &mut sink,
        json!({"type": "event", "event": "connect.challenge", "payload": {"nonce": nonce, "ts": 0}}),
    )
    .await;

    let mut runs = 0;
    while let Some(Ok(message)) = source.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let _ = requests.send(request.clone());
        let id = request["id"].clone();
        let params = &request["params"];

        match request["method"].as_str().unwrap_or_default() {
            "connect" => {
                if verify_connect(params, &token, &nonce) {
                    send(&mut sink, json!({"type": "res", "id": id, "ok": true,
                        "payload": {"type": "hello-ok", "protocol": 3,
                            "auth": {"deviceToken": format!("device-token-{n}")}}}))
                    .await;
                } else {
                    send(&mut sink, json!({"type": "res", "id": id, "ok": false,
                        "error": {"code": "UNAUTHORIZED", "message": "unauthorized"}}))
                    .await;
                }
            }
            "chat.send" => {
                let message = params["message"].as_str().unwrap_or_default();
                runs += 1;
                let run_id = format!("run-{n}-{runs}");
                match message {
                    "close" => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "done".into(),
                            })))
                            .await;
                        break;
                    }
                    "fail" => {
                        send(&mut sink, json!({"type": "res", "id": id, "ok": false,
                            "error": {"message": "boom"}}))
                        .await;
                    }
                    "final" => {
                        send(&mut sink, json!({"type": "res", "id": id, "ok": true,
                            "payload": {"runId": run_id}})).await;
                        send(&mut sink, json!({"type": "event", "event": "chat",
                            "payload": {"runId": run_id, "state": "final",
                                "message": {"content": [{"type": "text", "text": "final answer"}]}}}))
                        .await;
                    }
                    _ => {
                        send(&mut sink, json!({"type": "res", "id": id, "ok": true,
                            "payload": {"runId": run_id}})).await;
                        send(&mut sink, json!({"type": "event", "event": "tick", "payload": {}})).await;
                        for chunk in echo(message).split_inclusive(' ') {
                            send(&mut sink, json!({"type": "event", "event": "agent",
                                "payload": {"runId": run_id, "stream": "assistant",
                                    "data": {"delta": chunk}}}))
                            .await;
                        }
                        send(&mut sink, json!({"type": "event", "event": "agent",
                            "payload": {"runId": run_id, "stream": "lifecycle",
                                "data": {"phase": "end"}}}))
                        .await;
                    }
                }
            }
            "sessions.reset" => {
                send(&mut sink, json!({"type": "res", "id": id, "ok": true,
                    "payload": {"key": params["key"]}}))
                .await;
            }
            other => {
                send(&mut sink, json!({"type": "res", "id": id, "ok": false,
                    "error": {"message": format!("unknown method {other}")}}))
                .await;
            }
        }
    }
}

/// Check the bearer token and the device signature of a `connect` request.
pub fn verify_connect(params: &Value, token: &str, nonce: &str) -> bool {
    let device = &params["device"];
    let (Some(device_id), Some(public_key), Some(signature), Some(signed_at)) = (
        device["id"].as_str(),
        device["publicKey"].as_str(),
        device["signature"].as_str(),
        device["signedAt"].as_i64(),
    ) else {
        return false;
    };
    if params["auth"]["token"] != token || device["nonce"] != nonce {
        return false;
    }

    let Ok(raw_key) = URL_SAFE_NO_PAD.decode(public_key) else {
        return false;
    };
    if derive_device_id(&raw_key) != device_id {
        return false;
    }
    let Ok(key_bytes) = <[u8; 32]>::try_from(raw_key.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Some(signature) = URL_SAFE_NO_PAD
        .decode(signature)
        .ok()
        .and_then(|raw| Signature::from_slice(&raw).ok())
    else {
        return false;
    };

    let scopes: Vec<&str> = params["scopes"]
        .as_array()
        .map(|s| s.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let payload = DeviceAuthPayload {
        device_id,
        client_id: params["client"]["id"].as_str().unwrap_or_default(),
        client_mode: params["client"]["mode"].as_str().unwrap_or_default(),
        role: params["role"].as_str().unwrap_or_default(),
        scopes: &scopes,
        signed_at_ms: signed_at,
        token,
        nonce: Some(nonce),
    };
    key.verify(payload.canonical().as_bytes(), &signature).is_ok()
}
