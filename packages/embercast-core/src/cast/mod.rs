//! Cast receiver discovery and transport.
//!
//! - [`discovery`]: mDNS browsing for receivers on the local network
//! - [`traits`]: narrow transport abstraction consumed by services
//! - [`client`]: concrete transport over the CASTV2 protocol client
//! - [`types`]: shared data model (devices, status, control actions)

pub mod client;
pub mod discovery;
pub mod traits;
pub mod types;

pub use client::RustCastClient;
pub use discovery::DiscoveryError;
pub use traits::{
    CastClient, CastConnection, CastDiscovery, CastTransport, TransportError, TransportResult,
};
pub use types::{ControlAction, DeviceDescriptor, MediaLoad, PlaybackStatus};
