//! Axum handlers for the gateway routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::warn;
use wsgate_directory::SessionRecord;

use crate::errors::GatewayError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;
use crate::websocket::session::{run_client_session, run_relay_session};

/// Body of `POST /send`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Target session.
    pub session_id: String,
    /// Text written to the session's socket.
    pub message: String,
}

fn upgrade_failure(rejection: &WebSocketUpgradeRejection) -> GatewayError {
    GatewayError::UpgradeFailure(rejection.body_text())
}

/// GET /ws: accept a new client connection.
pub async fn client_ws(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, GatewayError> {
    let upgrade = upgrade.map_err(|e| upgrade_failure(&e))?;
    let gateway = state.gateway.clone();
    let heartbeat = state.config.heartbeat;
    Ok(upgrade
        .max_message_size(state.config.max_message_size)
        .on_failed_upgrade(|e| warn!(error = %e, "client upgrade failed"))
        .on_upgrade(move |socket| run_client_session(socket, gateway, heartbeat)))
}

/// GET /ws/send/{session_id}: relay inbound frames to a local session.
pub async fn relay_ws(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, GatewayError> {
    let upgrade = upgrade.map_err(|e| upgrade_failure(&e))?;
    let gateway = state.gateway.clone();
    Ok(upgrade
        .max_message_size(state.config.max_message_size)
        .on_failed_upgrade(|e| warn!(error = %e, "relay upgrade failed"))
        .on_upgrade(move |socket| run_relay_session(socket, session_id, gateway)))
}

/// POST /send: deliver a message to a session owned by this instance.
pub async fn send_handler(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<&'static str, GatewayError> {
    let Json(request) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    state
        .gateway
        .deliver(&request.session_id, &request.message)
        .await?;
    Ok("OK")
}

/// GET /session/{session_id}: the directory record.
pub async fn session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRecord>, GatewayError> {
    Ok(Json(state.gateway.lookup(&session_id).await?))
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        &state.gateway.instance().name,
        state.start_time,
        state.gateway.registry().len(),
    ))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
