//! End-to-end tests against a real listener and real WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use wsgate_directory::{Instance, MemoryStore, SessionDirectory, SessionRecord};
use wsgate_server::server::ServerTask;
use wsgate_server::{GatewayServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);
const TTL: Duration = Duration::from_secs(30 * 60);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestGateway {
    server: Arc<GatewayServer>,
    store: Arc<MemoryStore>,
    addr: SocketAddr,
    task: Option<ServerTask>,
    http: reqwest::Client,
}

impl TestGateway {
    async fn boot() -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = SessionDirectory::new(
            Instance::new("gw-a", "127.0.0.1", 0),
            store.clone(),
            TTL,
        );
        let config = ServerConfig {
            heartbeat: None,
            ..ServerConfig::default()
        };
        let server = Arc::new(GatewayServer::new(config, directory));
        let (addr, task) = server.listen().await.unwrap();
        Self {
            server,
            store,
            addr,
            task: Some(task),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Connect a client and return it with the session id from its greeting.
    async fn connect_client(&self) -> (WsStream, String) {
        let (mut ws, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .unwrap();
        let greeting: Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        assert_eq!(greeting["type"], "session.established");
        assert_eq!(greeting["instance"], "gw-a");
        let session_id = greeting["sessionId"].as_str().unwrap().to_string();
        (ws, session_id)
    }

    async fn connect_relay(&self, session_id: &str) -> WsStream {
        let (ws, _) = connect_async(format!("ws://{}/ws/send/{session_id}", self.addr))
            .await
            .unwrap();
        ws
    }

    async fn send(&self, session_id: &str, message: &str) -> (u16, String) {
        let resp = self
            .http
            .post(self.url("/send"))
            .json(&json!({"sessionId": session_id, "message": message}))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.text().await.unwrap())
    }

    async fn lookup_status(&self, session_id: &str) -> u16 {
        self.http
            .get(self.url(&format!("/session/{session_id}")))
            .send()
            .await
            .unwrap()
            .status()
            .as_u16()
    }

    async fn wait_for_lookup(&self, session_id: &str, status: u16) {
        timeout(TIMEOUT, async {
            while self.lookup_status(session_id).await != status {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
    }
}

/// Next text frame, skipping control frames.
async fn next_text(ws: &mut WsStream) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text.to_string();
        }
    }
}

/// Whether a text frame arrives within `wait`.
async fn receives_text_within(ws: &mut WsStream, wait: Duration) -> bool {
    timeout(wait, async {
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_text() {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Resolves once the server closed the stream.
async fn wait_closed(ws: &mut WsStream) {
    timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("stream was not closed");
}

#[tokio::test]
async fn connected_client_is_published() {
    let gw = TestGateway::boot().await;
    let (_ws, session_id) = gw.connect_client().await;

    let resp = gw
        .http
        .get(gw.url(&format!("/session/{session_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let record: SessionRecord = resp.json().await.unwrap();
    assert_eq!(record.session_id, session_id);
    assert_eq!(record.owning_instance.name, "gw-a");
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
}

#[tokio::test]
async fn send_reaches_client_and_extends_ttl() {
    let gw = TestGateway::boot().await;
    let (mut ws, session_id) = gw.connect_client().await;
    let directory = gw.server.gateway().directory();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = directory.expires_in(&session_id).await.unwrap().unwrap();

    let (status, body) = gw.send(&session_id, "hello").await;

    assert_eq!((status, body.as_str()), (200, "OK"));
    assert_eq!(next_text(&mut ws).await, "hello");
    let after = directory.expires_in(&session_id).await.unwrap().unwrap();
    assert!(after > before, "ttl not extended: {before:?} -> {after:?}");
}

#[tokio::test]
async fn send_to_unknown_session_is_404() {
    let gw = TestGateway::boot().await;
    let (status, _) = gw.send("f47ac10b-58cc-4372-a567-0e02b2c3d479", "hello").await;
    assert_eq!(status, 404);
    assert_eq!(gw.lookup_status("f47ac10b-58cc-4372-a567-0e02b2c3d479").await, 404);
}

#[tokio::test]
async fn disconnect_removes_session() {
    let gw = TestGateway::boot().await;
    let (mut ws, session_id) = gw.connect_client().await;
    assert_eq!(gw.lookup_status(&session_id).await, 200);

    ws.close(None).await.unwrap();

    gw.wait_for_lookup(&session_id, 404).await;
    assert!(gw.server.gateway().registry().lookup(&session_id).is_none());
    let (status, _) = gw.send(&session_id, "late").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn foreign_owner_is_rejected_without_write() {
    let gw = TestGateway::boot().await;
    let (mut ws, session_id) = gw.connect_client().await;
    let foreign = SessionRecord::new(&session_id, Instance::new("gw-b", "10.0.0.6", 10_000));
    gw.server
        .gateway()
        .directory()
        .put(&session_id, &foreign)
        .await
        .unwrap();

    let (status, body) = gw.send(&session_id, "hello").await;

    assert_eq!(status, 400);
    assert_eq!(body, "Session owned by different instance.");
    assert!(!receives_text_within(&mut ws, Duration::from_millis(200)).await);
}

#[tokio::test]
async fn relay_delivers_and_acknowledges() {
    let gw = TestGateway::boot().await;
    let (mut client, session_id) = gw.connect_client().await;
    let mut relay = gw.connect_relay(&session_id).await;

    relay.send(Message::Text("first".into())).await.unwrap();
    let reply: Value = serde_json::from_str(&next_text(&mut relay).await).unwrap();
    assert_eq!(reply, json!({"status": 200, "body": "OK"}));
    assert_eq!(next_text(&mut client).await, "first");

    relay.send(Message::Text("second".into())).await.unwrap();
    let reply: Value = serde_json::from_str(&next_text(&mut relay).await).unwrap();
    assert_eq!(reply["status"], 200);
    assert_eq!(next_text(&mut client).await, "second");
}

#[tokio::test]
async fn relay_to_absent_session_replies_gone_and_closes() {
    let gw = TestGateway::boot().await;
    let mut relay = gw.connect_relay("nobody").await;

    relay.send(Message::Text("hello".into())).await.unwrap();
    let reply: Value = serde_json::from_str(&next_text(&mut relay).await).unwrap();

    assert_eq!(reply["status"], 410);
    assert_eq!(reply["body"], "Session not connected to this instance.");
    wait_closed(&mut relay).await;
}

#[tokio::test]
async fn health_counts_connections() {
    let gw = TestGateway::boot().await;
    let (_a, _) = gw.connect_client().await;
    let (_b, _) = gw.connect_client().await;

    let health: Value = gw
        .http
        .get(gw.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 2);
}

#[tokio::test]
async fn concurrent_close_all_returns_same_result() {
    let gw = TestGateway::boot().await;
    let (mut a, _) = gw.connect_client().await;
    let (mut b, _) = gw.connect_client().await;

    let gateway = gw.server.gateway();
    let (first, second) = tokio::join!(gateway.shutdown(), gateway.shutdown());

    assert_eq!(first, second);
    assert!(first.is_ok());
    wait_closed(&mut a).await;
    wait_closed(&mut b).await;
}

#[tokio::test]
async fn shutdown_closes_clients_and_clears_directory() {
    let mut gw = TestGateway::boot().await;
    let (mut a, _) = gw.connect_client().await;
    let (mut b, _) = gw.connect_client().await;
    assert_eq!(gw.store.len(), 2);

    let task = gw.task.take().unwrap();
    gw.server.shutdown(task).await.unwrap();

    wait_closed(&mut a).await;
    wait_closed(&mut b).await;
    assert!(gw.store.is_empty());
    assert!(gw.server.gateway().registry().is_empty());
    assert!(connect_async(format!("ws://{}/ws", gw.addr)).await.is_err());
}
