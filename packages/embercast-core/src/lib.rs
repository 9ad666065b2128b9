//! Embercast Core - shared library for Embercast.
//!
//! This crate provides the core functionality for Embercast, a local HTTP
//! bridge for casting media to receiver devices on the LAN. It is designed
//! to be used by the standalone headless server.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`context`]: Network configuration and URL building
//! - [`state`]: Core application configuration
//! - [`cast`]: Receiver device discovery and transport (mDNS + cast protocol)
//! - [`media`]: Media reference classification and the upload store
//! - [`services`]: Session coordination and playback sequencing
//! - [`api`]: HTTP API layer
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from the
//! concrete cast transport:
//!
//! - [`CastDiscovery`](cast::CastDiscovery): Device discovery
//! - [`CastTransport`](cast::CastTransport): Opening device connections
//! - [`CastConnection`](cast::CastConnection): Per-device playback operations
//! - [`IpDetector`](context::IpDetector): Local IP detection
//!
//! Each trait has a default implementation suitable for the standalone
//! server; tests substitute mocks.

#![warn(clippy::all)]

pub mod api;
pub mod cast;
pub mod context;
pub mod error;
pub mod media;
pub mod services;
pub mod state;

// Re-export commonly used types at the crate root
pub use context::{IpDetector, LocalIpDetector, NetworkContext, NetworkError, UrlBuilder};
pub use error::{CastError, CastResult, ErrorCode};
pub use state::Config;

// Re-export cast types
pub use cast::{
    CastClient, CastConnection, CastDiscovery, CastTransport, ControlAction, DeviceDescriptor,
    DiscoveryError, MediaLoad, PlaybackStatus, RustCastClient, TransportError,
};

// Re-export media types
pub use media::{classify, content_type_for, MediaReference, MediaStore};

// Re-export service types
pub use services::SessionCoordinator;

// Re-export API types
pub use api::{start_server, AppState, AppStateBuilder, ServerError};
