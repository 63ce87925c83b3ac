//! # wsgate
//!
//! Gateway binary: loads settings, connects the session directory, and
//! serves client WebSocket connections until SIGINT or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use wsgate_directory::{DirectoryStore, Instance, MemoryStore, RedisStore, SessionDirectory};
use wsgate_server::{GatewayServer, ServerConfig};
use wsgate_settings::{DirectoryBackend, GatewaySettings, load_settings, profile_from_env};

/// Horizontally scalable WebSocket gateway.
#[derive(Parser, Debug)]
#[command(name = "wsgate", about = "WebSocket gateway with a shared session directory")]
struct Cli {
    /// Directory holding `application.json` and profile files.
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    /// Settings profile; loads `application-<profile>.json` on top of the base file.
    #[arg(long)]
    profile: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,
}

/// Load settings for `cli`, applying command-line overrides last.
fn load(cli: &Cli) -> Result<GatewaySettings> {
    let profile = cli.profile.clone().or_else(profile_from_env);
    let mut settings = load_settings(&cli.config_dir, profile.as_deref()).with_context(|| {
        format!(
            "Failed to load settings from {}",
            cli.config_dir.display()
        )
    })?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    Ok(settings)
}

/// Open the configured directory store. Redis must answer `PING`.
async fn open_store(settings: &GatewaySettings) -> Result<Arc<dyn DirectoryStore>> {
    match settings.directory.backend {
        DirectoryBackend::Redis => {
            let url = settings.redis.url();
            let store = RedisStore::connect(&url)
                .await
                .with_context(|| format!("Failed to connect to redis at {url}"))?;
            Ok(Arc::new(store))
        }
        DirectoryBackend::Memory => {
            warn!("using in-process directory store, sessions are not visible to other instances");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    wsgate_logging::init_from_settings(&settings.logging);
    let metrics = wsgate_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let store = open_store(&settings).await?;

    let config = ServerConfig::from(&settings.server);
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;

    let instance = Instance::resolve(
        settings.instance.name.as_deref(),
        settings.instance.ip.as_deref(),
        addr.port(),
    )
    .context("Failed to resolve instance identity")?;
    info!(%instance, "instance identity resolved");

    let directory = SessionDirectory::new(instance, store, settings.redis.ttl());
    let server = GatewayServer::new(config, directory).with_metrics(metrics);
    let mut task = server.serve(listener);
    info!(%addr, "wsgate listening");

    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        exited = &mut task => {
            return match exited {
                Ok(result) => result.context("HTTP server failed"),
                Err(e) => Err(e).context("HTTP server task failed"),
            };
        }
    }

    if let Err(e) = server.shutdown(task).await {
        warn!(error = %e, "shutdown finished with errors");
    }
    info!("wsgate stopped");
    Ok(())
}
