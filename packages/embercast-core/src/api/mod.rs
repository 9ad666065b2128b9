//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::context::NetworkContext;
use crate::media::MediaStore;
use crate::services::SessionCoordinator;
use crate::state::Config;

pub mod http;
pub mod range;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Coordinates the device session and playback sequencing.
    pub coordinator: Arc<SessionCoordinator>,
    /// File store for uploaded media.
    pub store: Arc<MediaStore>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    /// Application configuration.
    pub config: Arc<RwLock<Config>>,
}

/// Builder for constructing an `AppState`.
#[derive(Default)]
pub struct AppStateBuilder {
    coordinator: Option<Arc<SessionCoordinator>>,
    store: Option<Arc<MediaStore>>,
    network: Option<NetworkContext>,
    config: Option<Arc<RwLock<Config>>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session coordinator.
    pub fn coordinator(mut self, coordinator: Arc<SessionCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Sets the media store.
    pub fn store(mut self, store: Arc<MediaStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the network context.
    pub fn network(mut self, network: NetworkContext) -> Self {
        self.network = Some(network);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Arc<RwLock<Config>>) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the `AppState`, panicking if required fields are missing.
    pub fn build(self) -> AppState {
        AppState {
            coordinator: self.coordinator.expect("coordinator is required"),
            store: self.store.expect("store is required"),
            network: self.network.expect("network is required"),
            config: self.config.expect("config is required"),
        }
    }
}

impl AppState {
    /// Creates a new builder for constructing an `AppState`.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let preferred_port = state.config.read().preferred_port;
    let (port, listener) = if preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        find_available_port(5000, 5010).await?
    };

    // Set port and signal waiters
    state.network.set_port(port);

    log::info!("Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    // Use into_make_service_with_connect_info to enable ConnectInfo<SocketAddr> extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
