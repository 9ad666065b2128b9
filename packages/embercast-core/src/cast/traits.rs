//! Trait abstractions for cast operations.
//!
//! These traits enable dependency injection for testability and modularity.
//! Services depend on traits rather than concrete implementations, so any
//! cast-protocol binding can sit behind them.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::cast::discovery::DiscoveryError;
use crate::cast::types::{ControlAction, DeviceDescriptor, MediaLoad, PlaybackStatus};

/// Errors surfaced by a cast transport connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open a connection to the device.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A protocol command failed on an open connection.
    #[error("Command failed: {0}")]
    Command(String),

    /// The running receiver app does not support the media namespace.
    #[error("Receiver does not support media commands: {0}")]
    UnsupportedNamespace(String),

    /// The connection worker has exited; the connection is unusable.
    #[error("Transport worker unavailable")]
    WorkerGone,

    /// The device did not answer within the command timeout.
    #[error("Timed out waiting for the receiver")]
    Timeout,
}

/// Convenient Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Trait for receiver discovery operations.
///
/// Used by `SessionCoordinator` to populate the device snapshot that
/// `connect` resolves uuids against.
#[async_trait]
pub trait CastDiscovery: Send + Sync {
    /// Discovers cast receivers on the local network.
    ///
    /// Browses for up to `timeout` and returns whatever resolved in that
    /// window. An empty result is not an error.
    async fn discover(&self, timeout: Duration)
        -> Result<Vec<DeviceDescriptor>, DiscoveryError>;
}

/// Trait for opening transport connections to a receiver.
#[async_trait]
pub trait CastTransport: Send + Sync {
    /// Opens a connection to the given device, blocking until the
    /// transport confirms the platform channel is established.
    async fn connect(
        &self,
        device: &DeviceDescriptor,
    ) -> TransportResult<Box<dyn CastConnection>>;
}

/// A live connection to a receiver device.
///
/// All methods are synchronous request/response from the caller's
/// perspective; implementations bound each call with a timeout.
#[async_trait]
pub trait CastConnection: Send + Sync {
    /// Stops whatever receiver application is currently running.
    ///
    /// A receiver with nothing running is not an error.
    async fn stop_running_app(&self) -> TransportResult<()>;

    /// Launches the default media receiver application.
    async fn launch_media_receiver(&self) -> TransportResult<()>;

    /// Reports whether the launched receiver application is up and
    /// reachable. Used for bounded readiness polling.
    async fn receiver_ready(&self) -> TransportResult<bool>;

    /// Loads media into the launched receiver (buffered, autoplay).
    async fn load_media(&self, media: &MediaLoad) -> TransportResult<()>;

    /// Plays a shared-video id through the site's own receiver app.
    async fn play_shared_video(&self, video_id: &str) -> TransportResult<()>;

    /// Issues a play/pause/stop command against the current media session.
    async fn control(&self, action: ControlAction) -> TransportResult<()>;

    /// Seeks to an absolute position in seconds. Out-of-range values are
    /// passed through; receiver behavior for those is undefined.
    async fn seek(&self, seconds: f64) -> TransportResult<()>;

    /// Returns the transport-assigned media session id, if media is loaded.
    async fn media_session_id(&self) -> TransportResult<Option<i32>>;

    /// Reads a fresh playback status snapshot. `None` when the transport
    /// has no session information yet.
    async fn status(&self) -> TransportResult<Option<PlaybackStatus>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for all cast client operations.
///
/// Used by `SessionCoordinator` to hold a single client for discovery
/// and connection establishment.
#[async_trait]
pub trait CastClient: CastDiscovery + CastTransport {}

/// Blanket implementation for any type implementing both traits.
impl<T: CastDiscovery + CastTransport> CastClient for T {}
