//! WebSocket session lifecycle: one task per upgraded socket, from accept
//! through teardown.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::connection::{ClientConnection, WsSink};
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::HeartbeatConfig;
use crate::errors::GatewayError;
use crate::gateway::Gateway;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// First frame sent to a client once its session is published.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEstablished<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    session_id: &'a str,
    instance: &'a str,
}

impl<'a> SessionEstablished<'a> {
    /// Greeting for `session_id` owned by `instance`.
    pub fn new(session_id: &'a str, instance: &'a str) -> Self {
        Self {
            kind: "session.established",
            session_id,
            instance,
        }
    }
}

/// Per-frame reply on a relay stream.
#[derive(Debug, Serialize)]
pub struct RelayReply<'a> {
    status: u16,
    body: &'a str,
}

impl RelayReply<'_> {
    /// Reply for a relayed frame.
    pub fn from_result(result: &Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => RelayReply {
                status: 200,
                body: "OK",
            },
            Err(e) => RelayReply {
                status: e.status().as_u16(),
                body: e.body(),
            },
        }
    }
}

/// Serve a client socket accepted on `/ws`.
///
/// Mints a session id, registers the socket and publishes its ownership,
/// greets the client, then reads until the peer leaves, the heartbeat
/// gives up, or the server closes the socket. Teardown always runs
/// through [`Gateway::close_session`].
pub async fn run_client_session(
    socket: WebSocket,
    gateway: Arc<Gateway>,
    heartbeat: Option<HeartbeatConfig>,
) {
    let session_id = Uuid::new_v4().to_string();
    serve_client(socket, session_id, gateway, heartbeat).await;
}

#[instrument(skip_all, fields(session_id = %session_id))]
async fn serve_client(
    socket: WebSocket,
    session_id: String,
    gateway: Arc<Gateway>,
    heartbeat: Option<HeartbeatConfig>,
) {
    let (sink, mut stream) = socket.split();
    let sink: WsSink = Box::pin(sink);
    let connection = Arc::new(ClientConnection::new(session_id.clone(), sink));

    if let Err(e) = gateway.open_session(connection.clone()).await {
        warn!(error = %e, "failed to open session, closing socket");
        let _ = connection.close().await;
        return;
    }

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let greeting = SessionEstablished::new(&session_id, &gateway.instance().name);
    match serde_json::to_string(&greeting) {
        Ok(json) => {
            if let Err(e) = connection.send_text(&json).await {
                debug!(error = %e, "failed to send greeting");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode greeting"),
    }

    let heartbeat_task = heartbeat.map(|config| {
        let connection = connection.clone();
        tokio::spawn(async move {
            let result = run_heartbeat(connection.clone(), config).await;
            if result != HeartbeatResult::Cancelled {
                info!(session_id = %connection.id, ?result, "heartbeat failed, closing socket");
                let _ = connection.close().await;
            }
        })
    });

    loop {
        tokio::select! {
            () = connection.closed() => {
                debug!("socket closed locally");
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(msg)) => {
                    connection.mark_alive();
                    match msg {
                        Message::Text(text) => debug!(len = text.len(), "received text frame"),
                        Message::Binary(data) => debug!(len = data.len(), "received binary frame"),
                        Message::Ping(_) | Message::Pong(_) => {}
                        Message::Close(_) => {
                            debug!("client sent close frame");
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "read failed");
                    break;
                }
                None => break,
            },
        }
    }

    if let Some(task) = heartbeat_task {
        task.abort();
    }
    gateway.close_session(&connection).await;
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Serve a relay socket accepted on `/ws/send/{session_id}`.
///
/// Every inbound text frame is written to the local session and answered
/// with a [`RelayReply`]. The relay stream is closed after the first
/// failed delivery.
#[instrument(skip(socket, gateway))]
pub async fn run_relay_session(socket: WebSocket, session_id: String, gateway: Arc<Gateway>) {
    let (mut sink, mut stream) = socket.split();
    info!("relay stream opened");

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "relay read failed");
                break;
            }
        };

        let result = gateway.relay(&session_id, text.as_str()).await;
        let failed = result.is_err();
        let reply = match serde_json::to_string(&RelayReply::from_result(&result)) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode relay reply");
                break;
            }
        };
        if sink.send(Message::Text(reply.into())).await.is_err() || failed {
            break;
        }
    }

    let _ = sink.close().await;
    info!("relay stream closed");
}
