//! Embercast Server - Standalone headless casting server.
//!
//! This binary exposes the HTTP casting API as a background daemon:
//! device discovery, playback control, and upload hosting for receiver
//! devices on the local network.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use embercast_core::{
    start_server, AppState, LocalIpDetector, MediaStore, NetworkContext, RustCastClient,
    SessionCoordinator,
};
use parking_lot::RwLock;
use tokio::signal;

use crate::config::ServerConfig;

/// Embercast Server - Headless media casting server.
#[derive(Parser, Debug)]
#[command(name = "embercast-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "EMBERCAST_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "EMBERCAST_BIND_PORT")]
    port: Option<u16>,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "EMBERCAST_ADVERTISE_IP")]
    advertise_ip: Option<std::net::IpAddr>,

    /// Directory for uploaded media files.
    #[arg(short = 'u', long, env = "EMBERCAST_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Embercast Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(upload_dir) = args.upload_dir {
        config.upload_dir = upload_dir;
    }

    // Resolve advertise IP: use explicit config, or fall back to auto-detection
    let network = if let Some(ip) = config.advertise_ip {
        log::info!(
            "Configuration: bind_port={}, advertise_ip={}",
            config.bind_port,
            ip
        );
        NetworkContext::explicit(config.bind_port, ip)
    } else {
        log::info!(
            "Configuration: bind_port={}, advertise_ip=auto",
            config.bind_port
        );
        let detector = LocalIpDetector::arc();
        NetworkContext::auto_detect(config.bind_port, detector).context(
            "Failed to auto-detect local IP address. \
             Please specify --advertise-ip or set EMBERCAST_ADVERTISE_IP to the IP \
             address that receiver devices can reach.",
        )?
    };

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    // Cast client: owns the mDNS daemon for the process lifetime
    let client = Arc::new(RustCastClient::new().context("Failed to start mDNS daemon")?);

    // Upload store
    let store = Arc::new(MediaStore::new(
        core_config.upload_dir.clone(),
        core_config.max_upload_bytes,
    ));
    store
        .ensure_root()
        .await
        .context("Failed to create upload directory")?;
    log::info!("Upload directory: {}", store.root().display());

    let shared_config = Arc::new(RwLock::new(core_config));
    let coordinator = Arc::new(SessionCoordinator::new(
        client,
        network.clone(),
        shared_config.clone(),
    ));

    // Build app state for the HTTP server
    let app_state = AppState::builder()
        .coordinator(coordinator)
        .store(store)
        .network(network)
        .config(shared_config)
        .build();

    // Spawn the HTTP server on the main tokio runtime
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP server started on port {}", config.bind_port);

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Dropping the server task tears down connections; worker threads exit
    // when their command channels close.
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
