//! Concrete cast transport over the CASTV2 protocol client.
//!
//! The underlying protocol client (`rust_cast`) is a blocking, socket-owning
//! API, so each connection is owned by a dedicated worker thread. The async
//! trait methods send a command over a channel and await the worker's reply
//! under a timeout; the worker performs the actual protocol calls and tracks
//! the launched app's transport/session identifiers.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::ServiceDaemon;
use rust_cast::channels::media::{
    GenericMediaMetadata, Media, Metadata, PlayerState, StreamType,
};
use rust_cast::channels::receiver::CastDeviceApp;
use rust_cast::CastDevice;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::cast::discovery::{self, DiscoveryError};
use crate::cast::traits::{
    CastConnection, CastDiscovery, CastTransport, TransportError, TransportResult,
};
use crate::cast::types::{ControlAction, DeviceDescriptor, MediaLoad, PlaybackStatus};

/// Destination id of the always-present platform receiver.
const PLATFORM_RECEIVER_ID: &str = "receiver-0";

/// Content type the shared-video receiver expects for video ids.
const SHARED_VIDEO_CONTENT_TYPE: &str = "x-youtube/video";

/// Upper bound on any single protocol round-trip.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Depth of the per-connection command queue.
const COMMAND_QUEUE_DEPTH: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Cast client backed by mDNS discovery and the CASTV2 protocol.
pub struct RustCastClient {
    daemon: Arc<ServiceDaemon>,
    command_timeout: Duration,
}

impl RustCastClient {
    /// Creates a new client with its own mDNS daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be created.
    pub fn new() -> Result<Self, DiscoveryError> {
        Ok(Self {
            daemon: Arc::new(discovery::create_daemon()?),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    /// Overrides the per-command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[async_trait]
impl CastDiscovery for RustCastClient {
    async fn discover(
        &self,
        timeout: Duration,
    ) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
        discovery::discover_mdns(&self.daemon, timeout).await
    }
}

#[async_trait]
impl CastTransport for RustCastClient {
    async fn connect(
        &self,
        device: &DeviceDescriptor,
    ) -> TransportResult<Box<dyn CastConnection>> {
        let conn =
            WorkerConnection::spawn(device.addr, device.port, self.command_timeout).await?;
        Ok(Box::new(conn))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker Connection
// ─────────────────────────────────────────────────────────────────────────────

/// Commands understood by the connection worker.
enum Command {
    StopRunningApp,
    LaunchMediaReceiver,
    ReceiverReady,
    LoadMedia(MediaLoad),
    PlaySharedVideo(String),
    Control(ControlAction),
    Seek(f64),
    MediaSessionId,
    Status,
}

/// Replies produced by the worker, one variant per command family.
enum Reply {
    Unit,
    Ready(bool),
    SessionId(Option<i32>),
    Status(Option<PlaybackStatus>),
}

struct Request {
    command: Command,
    reply: oneshot::Sender<TransportResult<Reply>>,
}

/// Connection handle whose protocol work runs on a dedicated thread.
///
/// Dropping the handle closes the command channel, which ends the worker
/// loop and tears down the protocol socket.
struct WorkerConnection {
    tx: mpsc::Sender<Request>,
    command_timeout: Duration,
}

impl WorkerConnection {
    /// Spawns the worker thread and waits for it to establish the
    /// platform channel.
    async fn spawn(
        addr: IpAddr,
        port: u16,
        command_timeout: Duration,
    ) -> TransportResult<Self> {
        let (tx, rx) = mpsc::channel::<Request>(COMMAND_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel::<TransportResult<()>>();

        let host = addr.to_string();
        std::thread::Builder::new()
            .name(format!("cast-conn-{host}"))
            .spawn(move || run_worker(&host, port, ready_tx, rx))
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        match timeout(command_timeout, ready_rx).await {
            Ok(Ok(result)) => result.map(|_| Self {
                tx,
                command_timeout,
            }),
            Ok(Err(_)) => Err(TransportError::WorkerGone),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn call(&self, command: Command) -> TransportResult<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TransportError::WorkerGone)?;

        match timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::WorkerGone),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl CastConnection for WorkerConnection {
    async fn stop_running_app(&self) -> TransportResult<()> {
        self.call(Command::StopRunningApp).await.map(|_| ())
    }

    async fn launch_media_receiver(&self) -> TransportResult<()> {
        self.call(Command::LaunchMediaReceiver).await.map(|_| ())
    }

    async fn receiver_ready(&self) -> TransportResult<bool> {
        match self.call(Command::ReceiverReady).await? {
            Reply::Ready(ready) => Ok(ready),
            _ => Ok(false),
        }
    }

    async fn load_media(&self, media: &MediaLoad) -> TransportResult<()> {
        self.call(Command::LoadMedia(media.clone())).await.map(|_| ())
    }

    async fn play_shared_video(&self, video_id: &str) -> TransportResult<()> {
        self.call(Command::PlaySharedVideo(video_id.to_string()))
            .await
            .map(|_| ())
    }

    async fn control(&self, action: ControlAction) -> TransportResult<()> {
        self.call(Command::Control(action)).await.map(|_| ())
    }

    async fn seek(&self, seconds: f64) -> TransportResult<()> {
        self.call(Command::Seek(seconds)).await.map(|_| ())
    }

    async fn media_session_id(&self) -> TransportResult<Option<i32>> {
        match self.call(Command::MediaSessionId).await? {
            Reply::SessionId(id) => Ok(id),
            _ => Ok(None),
        }
    }

    async fn status(&self) -> TransportResult<Option<PlaybackStatus>> {
        match self.call(Command::Status).await? {
            Reply::Status(status) => Ok(status),
            _ => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

/// Receiver application launched on the device.
struct LaunchedApp {
    transport_id: String,
    session_id: String,
    media_session_id: Option<i32>,
}

/// Worker entry point: connects, signals readiness, then serves commands
/// until the channel closes.
fn run_worker(
    host: &str,
    port: u16,
    ready_tx: oneshot::Sender<TransportResult<()>>,
    mut rx: mpsc::Receiver<Request>,
) {
    let device = match CastDevice::connect_without_host_verification(host, port) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready_tx.send(Err(TransportError::Connect(e.to_string())));
            return;
        }
    };

    if let Err(e) = device.connection.connect(PLATFORM_RECEIVER_ID) {
        let _ = ready_tx.send(Err(TransportError::Connect(e.to_string())));
        return;
    }

    log::debug!("[Cast] Connected to {}:{}", host, port);
    let _ = ready_tx.send(Ok(()));

    let mut app: Option<LaunchedApp> = None;
    while let Some(request) = rx.blocking_recv() {
        let result = handle_command(&device, &mut app, request.command);
        let _ = request.reply.send(result);
    }

    log::debug!("[Cast] Connection to {}:{} closed", host, port);
}

fn handle_command(
    device: &CastDevice<'_>,
    app: &mut Option<LaunchedApp>,
    command: Command,
) -> TransportResult<Reply> {
    match command {
        Command::StopRunningApp => {
            let status = device
                .receiver
                .get_status()
                .map_err(command_error)?;
            for running in &status.applications {
                // "Nothing to stop" and similar receiver complaints are not
                // failures here
                if let Err(e) = device.receiver.stop_app(running.session_id.as_str()) {
                    log::debug!("[Cast] Ignoring stop_app failure: {}", e);
                }
            }
            *app = None;
            Ok(Reply::Unit)
        }

        Command::LaunchMediaReceiver => {
            launch(device, app, &CastDeviceApp::DefaultMediaReceiver)?;
            Ok(Reply::Unit)
        }

        Command::ReceiverReady => {
            let Some(launched) = app.as_ref() else {
                return Ok(Reply::Ready(false));
            };
            let status = device
                .receiver
                .get_status()
                .map_err(command_error)?;
            let up = status
                .applications
                .iter()
                .any(|a| a.session_id == launched.session_id);
            Ok(Reply::Ready(up))
        }

        Command::LoadMedia(request) => {
            let launched = require_app(app)?;
            let media = Media {
                content_id: request.url,
                content_type: request.content_type,
                stream_type: StreamType::Buffered,
                duration: None,
                metadata: Some(Metadata::Generic(GenericMediaMetadata {
                    title: Some(request.title),
                    ..Default::default()
                })),
            };
            let status = device
                .media
                .load(
                    launched.transport_id.as_str(),
                    launched.session_id.as_str(),
                    &media,
                )
                .map_err(command_error)?;
            launched.media_session_id = status.entries.first().map(|e| e.media_session_id);
            Ok(Reply::Unit)
        }

        Command::PlaySharedVideo(video_id) => {
            launch(device, app, &CastDeviceApp::YouTube)?;
            let launched = require_app(app)?;
            let media = Media {
                content_id: video_id,
                content_type: SHARED_VIDEO_CONTENT_TYPE.to_string(),
                stream_type: StreamType::Buffered,
                duration: None,
                metadata: None,
            };
            let status = device
                .media
                .load(
                    launched.transport_id.as_str(),
                    launched.session_id.as_str(),
                    &media,
                )
                .map_err(command_error)?;
            launched.media_session_id = status.entries.first().map(|e| e.media_session_id);
            Ok(Reply::Unit)
        }

        Command::Control(action) => {
            let launched = require_app(app)?;
            let session_id = resolve_media_session_id(device, launched)?
                .ok_or_else(|| TransportError::Command("No media session".into()))?;
            let transport_id = launched.transport_id.as_str();
            match action {
                ControlAction::Play => {
                    device
                        .media
                        .play(transport_id, session_id)
                        .map_err(command_error)?;
                }
                ControlAction::Pause => {
                    device
                        .media
                        .pause(transport_id, session_id)
                        .map_err(command_error)?;
                }
                ControlAction::Stop => {
                    device
                        .media
                        .stop(transport_id, session_id)
                        .map_err(command_error)?;
                    launched.media_session_id = None;
                }
            }
            Ok(Reply::Unit)
        }

        Command::Seek(seconds) => {
            let launched = require_app(app)?;
            let session_id = resolve_media_session_id(device, launched)?
                .ok_or_else(|| TransportError::Command("No media session".into()))?;
            device
                .media
                .seek(
                    launched.transport_id.as_str(),
                    session_id,
                    Some(seconds as f32),
                    None,
                )
                .map_err(command_error)?;
            Ok(Reply::Unit)
        }

        Command::MediaSessionId => {
            let Some(launched) = app.as_mut() else {
                return Ok(Reply::SessionId(None));
            };
            let id = resolve_media_session_id(device, launched)?;
            Ok(Reply::SessionId(id))
        }

        Command::Status => {
            let Some(launched) = app.as_ref() else {
                return Ok(Reply::Status(None));
            };
            let media_status = device
                .media
                .get_status(launched.transport_id.as_str(), None)
                .map_err(command_error)?;
            let Some(entry) = media_status.entries.first() else {
                return Ok(Reply::Status(None));
            };
            let receiver_status = device
                .receiver
                .get_status()
                .map_err(command_error)?;
            Ok(Reply::Status(Some(PlaybackStatus {
                player_state: player_state_str(&entry.player_state).to_string(),
                current_time: entry.current_time.unwrap_or(0.0) as f64,
                duration: entry
                    .media
                    .as_ref()
                    .and_then(|m| m.duration)
                    .unwrap_or(0.0) as f64,
                volume_level: receiver_status.volume.level.unwrap_or(0.0),
                volume_muted: receiver_status.volume.muted.unwrap_or(false),
            })))
        }
    }
}

/// Launches a receiver app and connects to its transport channel.
fn launch(
    device: &CastDevice<'_>,
    app: &mut Option<LaunchedApp>,
    which: &CastDeviceApp,
) -> TransportResult<()> {
    let launched = device.receiver.launch_app(which).map_err(command_error)?;
    device
        .connection
        .connect(launched.transport_id.as_str())
        .map_err(command_error)?;
    *app = Some(LaunchedApp {
        transport_id: launched.transport_id,
        session_id: launched.session_id,
        media_session_id: None,
    });
    Ok(())
}

fn require_app<'a>(app: &'a mut Option<LaunchedApp>) -> TransportResult<&'a mut LaunchedApp> {
    app.as_mut()
        .ok_or_else(|| TransportError::Command("No receiver app launched".into()))
}

/// Returns the cached media session id, querying the device if none is
/// cached yet (a session may appear after load while the media settles).
fn resolve_media_session_id(
    device: &CastDevice<'_>,
    app: &mut LaunchedApp,
) -> TransportResult<Option<i32>> {
    if app.media_session_id.is_some() {
        return Ok(app.media_session_id);
    }
    let status = device
        .media
        .get_status(app.transport_id.as_str(), None)
        .map_err(command_error)?;
    app.media_session_id = status.entries.first().map(|e| e.media_session_id);
    Ok(app.media_session_id)
}

fn player_state_str(state: &PlayerState) -> &'static str {
    match state {
        PlayerState::Playing => "PLAYING",
        PlayerState::Paused => "PAUSED",
        PlayerState::Buffering => "BUFFERING",
        PlayerState::Idle => "IDLE",
    }
}

fn command_error(err: rust_cast::errors::Error) -> TransportError {
    classify_command_error(err.to_string())
}

/// Distinguishes the receiver's unsupported-namespace rejection (the app
/// has no media channel) from other command failures.
fn classify_command_error(message: String) -> TransportError {
    if message.to_lowercase().contains("namespace") {
        TransportError::UnsupportedNamespace(message)
    } else {
        TransportError::Command(message)
    }
}
