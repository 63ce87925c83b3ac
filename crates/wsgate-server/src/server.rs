//! `GatewayServer`: axum HTTP + WebSocket server for one gateway instance.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wsgate_directory::SessionDirectory;

use crate::config::ServerConfig;
use crate::errors::SocketError;
use crate::gateway::Gateway;
use crate::handlers;
use crate::metrics::detached_handle;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry, directory, and delivery protocol.
    pub gateway: Arc<Gateway>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics: PrometheusHandle,
}

/// Running HTTP server task.
pub type ServerTask = JoinHandle<io::Result<()>>;

/// The gateway server.
pub struct GatewayServer {
    config: Arc<ServerConfig>,
    gateway: Arc<Gateway>,
    shutdown: ShutdownCoordinator,
    metrics: PrometheusHandle,
    start_time: Instant,
}

impl GatewayServer {
    /// Create a server publishing sessions to `directory`.
    pub fn new(config: ServerConfig, directory: SessionDirectory) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(Gateway::new(directory)),
            shutdown: ShutdownCoordinator::new(),
            metrics: detached_handle(),
            start_time: Instant::now(),
        }
    }

    /// Render `/metrics` from `handle` (usually the globally installed recorder).
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = handle;
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(handlers::client_ws))
            .route("/ws/send/{session_id}", get(handlers::relay_ws))
            .route("/send", post(handlers::send_handler))
            .route("/session/{session_id}", get(handlers::session_handler))
            .route("/health", get(handlers::health_handler))
            .route("/metrics", get(handlers::metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured host and port.
    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind((self.config.host.as_str(), self.config.port)).await
    }

    /// Serve on `listener` until shutdown is requested.
    pub fn serve(&self, listener: TcpListener) -> ServerTask {
        let router = self.router();
        let stop = self.shutdown.token().cancelled_owned();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(stop)
                .await
        })
    }

    /// Bind and serve; returns the bound address and the server task.
    pub async fn listen(&self) -> io::Result<(SocketAddr, ServerTask)> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;
        info!(%addr, instance = %self.gateway.instance().name, "gateway listening");
        Ok((addr, self.serve(listener)))
    }

    /// Stop accepting requests, close every client socket, and wait for
    /// in-flight HTTP requests, all within the configured shutdown timeout.
    ///
    /// Returns the first socket close error, or [`SocketError::Timeout`] when
    /// the deadline passes first.
    pub async fn shutdown(&self, server: ServerTask) -> Result<(), SocketError> {
        let gateway = self.gateway.clone();
        let drain = async move {
            let closed = gateway.shutdown().await;
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "http server exited with error"),
                Err(e) => warn!(error = %e, "http server task failed"),
            }
            closed
        };
        self.shutdown
            .graceful_shutdown(drain, self.config.shutdown_timeout)
            .await
            .unwrap_or(Err(SocketError::Timeout))
    }

    /// The protocol layer.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }
}
