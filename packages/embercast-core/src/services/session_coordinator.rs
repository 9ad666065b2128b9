//! Device session and playback coordination.
//!
//! The coordinator owns the single "selected device" session and sequences
//! the multi-step protocol required to start playback. All entry points
//! serialize on the session mutex for their full duration, so a connect
//! cannot race an in-flight control action and two control actions cannot
//! interleave against different sessions.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::cast::traits::{CastClient, CastConnection};
use crate::cast::types::{ControlAction, DeviceDescriptor, MediaLoad, PlaybackStatus};
use crate::context::NetworkContext;
use crate::error::{CastError, CastResult};
use crate::media::classify::{classify, MediaReference};
use crate::state::Config;

/// The currently selected device and its live connection.
struct ActiveSession {
    device: DeviceDescriptor,
    connection: Box<dyn CastConnection>,
}

/// Coordinates device selection and playback sequencing.
///
/// Holds the most recent discovery snapshot (which `connect` resolves
/// uuids against) and at most one active session at a time. A later
/// connect replaces the session implicitly; the previous connection is
/// dropped without explicit teardown.
pub struct SessionCoordinator {
    client: Arc<dyn CastClient>,
    network: NetworkContext,
    config: Arc<RwLock<Config>>,
    /// Last discovery results; replaced wholesale on each discovery pass.
    devices: RwLock<Vec<DeviceDescriptor>>,
    /// The single selected session. Async mutex: held across transport awaits.
    session: Mutex<Option<ActiveSession>>,
}

impl SessionCoordinator {
    /// Creates a new coordinator.
    pub fn new(
        client: Arc<dyn CastClient>,
        network: NetworkContext,
        config: Arc<RwLock<Config>>,
    ) -> Self {
        Self {
            client,
            network,
            config,
            devices: RwLock::new(Vec::new()),
            session: Mutex::new(None),
        }
    }

    /// Runs a discovery pass and replaces the device snapshot.
    pub async fn discover_devices(&self) -> CastResult<Vec<DeviceDescriptor>> {
        let timeout = self.config.read().discovery_timeout();
        let devices = self.client.discover(timeout).await?;
        log::info!("[Coordinator] Discovery found {} device(s)", devices.len());
        *self.devices.write() = devices.clone();
        Ok(devices)
    }

    /// Connects to a device from the last discovery snapshot and installs
    /// it as the selected session, replacing any prior one.
    ///
    /// Returns the device's display name.
    pub async fn connect(&self, uuid: uuid::Uuid) -> CastResult<String> {
        let device = self
            .devices
            .read()
            .iter()
            .find(|d| d.uuid == uuid)
            .cloned()
            .ok_or_else(|| CastError::DeviceNotFound(uuid.to_string()))?;

        log::info!(
            "[Coordinator] Connecting to {} ({})",
            device.name,
            device.addr
        );
        let connection = self.client.connect(&device).await?;

        let name = device.name.clone();
        let mut session = self.session.lock().await;
        *session = Some(ActiveSession { device, connection });
        Ok(name)
    }

    /// Classifies a URL and starts playback on the selected device.
    pub async fn start_playback(&self, url: &str) -> CastResult<String> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(CastError::NoActiveSession)?;

        let reference = classify(url, &self.network.url_builder());
        match reference {
            MediaReference::SharedVideo { video_id } => {
                log::info!(
                    "[Coordinator] Playing shared video {} on {}",
                    video_id,
                    session.device.name
                );
                session.connection.play_shared_video(&video_id).await?;
                Ok(format!("Playing video {video_id}"))
            }
            MediaReference::DirectStream {
                url,
                content_type,
                title,
            } => {
                log::info!(
                    "[Coordinator] Streaming {} ({}) to {}",
                    url,
                    content_type,
                    session.device.name
                );
                self.start_direct_stream(
                    session.connection.as_ref(),
                    MediaLoad {
                        url,
                        content_type,
                        title,
                    },
                )
                .await?;
                Ok("Streaming media".to_string())
            }
        }
    }

    /// Runs the fixed direct-stream protocol sequence.
    ///
    /// Stop running app (errors ignored), launch the media receiver, poll
    /// until it is ready, load the media, wait out the settle window for a
    /// media session id, then issue an explicit play in case autoplay did
    /// not engage.
    async fn start_direct_stream(
        &self,
        connection: &dyn CastConnection,
        media: MediaLoad,
    ) -> CastResult<()> {
        let (ready_timeout, poll_interval, settle_timeout) = {
            let config = self.config.read();
            (
                config.receiver_ready_timeout(),
                config.receiver_poll_interval(),
                config.media_settle_timeout(),
            )
        };

        // A receiver with nothing running rejects the stop; that is fine
        if let Err(e) = connection.stop_running_app().await {
            log::debug!("[Coordinator] stop_running_app: {e}");
        }

        connection.launch_media_receiver().await?;
        self.poll_receiver_ready(connection, ready_timeout, poll_interval)
            .await?;

        connection.load_media(&media).await?;

        // Settle window: wait for a media session id, but tolerate its
        // absence. Playback is never reported started before this window.
        self.poll_media_session(connection, settle_timeout, poll_interval)
            .await;

        connection.control(ControlAction::Play).await?;
        Ok(())
    }

    /// Polls the connection until the launched receiver reports ready.
    async fn poll_receiver_ready(
        &self,
        connection: &dyn CastConnection,
        timeout: Duration,
        interval: Duration,
    ) -> CastResult<()> {
        let start = tokio::time::Instant::now();
        loop {
            if connection.receiver_ready().await? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(CastError::Playback(
                    "Receiver application did not become ready".into(),
                ));
            }
            sleep(interval).await;
        }
    }

    /// Waits out the settle window after a load, returning early once the
    /// transport reports a media session id.
    async fn poll_media_session(
        &self,
        connection: &dyn CastConnection,
        timeout: Duration,
        interval: Duration,
    ) {
        let start = tokio::time::Instant::now();
        loop {
            match connection.media_session_id().await {
                Ok(Some(_)) => return,
                Ok(None) => {}
                Err(e) => {
                    log::debug!("[Coordinator] media_session_id during settle: {e}");
                }
            }
            if start.elapsed() >= timeout {
                log::debug!("[Coordinator] No media session within settle window");
                return;
            }
            sleep(interval).await;
        }
    }

    /// Issues a control action against the active media session.
    ///
    /// Waits up to the confirm timeout for the transport to reflect the
    /// action, but reports success either way: the external contract is
    /// "requested", not "confirmed".
    pub async fn control(&self, action: ControlAction) -> CastResult<()> {
        let (confirm_timeout, poll_interval) = {
            let config = self.config.read();
            (
                config.control_confirm_timeout(),
                config.receiver_poll_interval(),
            )
        };

        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(CastError::NoActiveSession)?;

        let media_session = session.connection.media_session_id().await?;
        if media_session.is_none() {
            return Err(CastError::NoActiveMediaSession);
        }

        log::info!(
            "[Coordinator] Control {} on {}",
            action,
            session.device.name
        );
        session.connection.control(action).await?;

        let expected = action.expected_player_state();
        let start = tokio::time::Instant::now();
        while start.elapsed() < confirm_timeout {
            match session.connection.status().await {
                Ok(Some(status)) if status.player_state == expected => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    log::debug!("[Coordinator] status during confirm: {e}");
                }
            }
            sleep(poll_interval).await;
        }

        log::debug!(
            "[Coordinator] {} not confirmed within {:?}; reporting requested",
            action,
            confirm_timeout
        );
        Ok(())
    }

    /// Seeks to an absolute position. No bounds validation; out-of-range
    /// values are passed through to the transport.
    pub async fn seek(&self, seconds: f64) -> CastResult<()> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(CastError::NoActiveSession)?;

        log::info!(
            "[Coordinator] Seek to {}s on {}",
            seconds,
            session.device.name
        );
        session.connection.seek(seconds).await?;
        Ok(())
    }

    /// Reads a fresh playback status from the transport.
    pub async fn status(&self) -> CastResult<PlaybackStatus> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(CastError::NoActiveSession)?;

        session
            .connection
            .status()
            .await?
            .ok_or(CastError::NoMediaStatus)
    }

    /// Name of the currently selected device, if any.
    pub async fn selected_device(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.device.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::net::{IpAddr, Ipv4Addr};
    use uuid::Uuid;

    use crate::cast::discovery::DiscoveryError;
    use crate::cast::traits::{
        CastDiscovery, CastTransport, TransportError, TransportResult,
    };

    /// Shared recording of calls made against mock connections, tagged
    /// with the device name the connection was opened for.
    type CallLog = Arc<SyncMutex<Vec<String>>>;

    #[derive(Clone)]
    struct MockBehavior {
        media_session_id: Option<i32>,
        status: Option<PlaybackStatus>,
        fail_load_with_namespace: bool,
        ready_after_polls: usize,
    }

    impl Default for MockBehavior {
        fn default() -> Self {
            Self {
                media_session_id: Some(1),
                status: Some(playing_status()),
                fail_load_with_namespace: false,
                ready_after_polls: 0,
            }
        }
    }

    fn playing_status() -> PlaybackStatus {
        PlaybackStatus {
            player_state: "PLAYING".into(),
            current_time: 1.5,
            duration: 120.0,
            volume_level: 0.8,
            volume_muted: false,
        }
    }

    struct MockConnection {
        device_name: String,
        calls: CallLog,
        behavior: MockBehavior,
        ready_polls: SyncMutex<usize>,
    }

    impl MockConnection {
        fn record(&self, call: &str) {
            self.calls
                .lock()
                .push(format!("{}:{}", self.device_name, call));
        }
    }

    #[async_trait]
    impl CastConnection for MockConnection {
        async fn stop_running_app(&self) -> TransportResult<()> {
            self.record("stop_running_app");
            Ok(())
        }

        async fn launch_media_receiver(&self) -> TransportResult<()> {
            self.record("launch_media_receiver");
            Ok(())
        }

        async fn receiver_ready(&self) -> TransportResult<bool> {
            self.record("receiver_ready");
            let mut polls = self.ready_polls.lock();
            *polls += 1;
            Ok(*polls > self.behavior.ready_after_polls)
        }

        async fn load_media(&self, media: &MediaLoad) -> TransportResult<()> {
            self.record(&format!("load_media:{}", media.url));
            if self.behavior.fail_load_with_namespace {
                return Err(TransportError::UnsupportedNamespace(
                    "urn:x-cast:com.google.cast.media".into(),
                ));
            }
            Ok(())
        }

        async fn play_shared_video(&self, video_id: &str) -> TransportResult<()> {
            self.record(&format!("play_shared_video:{video_id}"));
            Ok(())
        }

        async fn control(&self, action: ControlAction) -> TransportResult<()> {
            self.record(&format!("control:{action}"));
            Ok(())
        }

        async fn seek(&self, seconds: f64) -> TransportResult<()> {
            self.record(&format!("seek:{seconds}"));
            Ok(())
        }

        async fn media_session_id(&self) -> TransportResult<Option<i32>> {
            self.record("media_session_id");
            Ok(self.behavior.media_session_id)
        }

        async fn status(&self) -> TransportResult<Option<PlaybackStatus>> {
            self.record("status");
            Ok(self.behavior.status.clone())
        }
    }

    struct MockClient {
        devices: Vec<DeviceDescriptor>,
        calls: CallLog,
        behavior: MockBehavior,
    }

    #[async_trait]
    impl CastDiscovery for MockClient {
        async fn discover(
            &self,
            _timeout: Duration,
        ) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
            Ok(self.devices.clone())
        }
    }

    #[async_trait]
    impl CastTransport for MockClient {
        async fn connect(
            &self,
            device: &DeviceDescriptor,
        ) -> TransportResult<Box<dyn CastConnection>> {
            Ok(Box::new(MockConnection {
                device_name: device.name.clone(),
                calls: self.calls.clone(),
                behavior: self.behavior.clone(),
                ready_polls: SyncMutex::new(0),
            }))
        }
    }

    fn device(name: &str, uuid: Uuid) -> DeviceDescriptor {
        DeviceDescriptor {
            name: name.to_string(),
            uuid,
            addr: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
            port: 8009,
        }
    }

    fn coordinator_with(
        devices: Vec<DeviceDescriptor>,
        behavior: MockBehavior,
    ) -> (SessionCoordinator, CallLog) {
        let calls: CallLog = Arc::new(SyncMutex::new(Vec::new()));
        let client = Arc::new(MockClient {
            devices,
            calls: calls.clone(),
            behavior,
        });
        let coordinator = SessionCoordinator::new(
            client,
            NetworkContext::for_test(),
            Arc::new(RwLock::new(Config::default())),
        );
        (coordinator, calls)
    }

    #[tokio::test]
    async fn control_without_session_fails() {
        let (coordinator, _) = coordinator_with(vec![], MockBehavior::default());
        let err = coordinator.control(ControlAction::Play).await.unwrap_err();
        assert!(matches!(err, CastError::NoActiveSession));
    }

    #[tokio::test]
    async fn start_playback_without_session_fails() {
        let (coordinator, calls) = coordinator_with(vec![], MockBehavior::default());
        let err = coordinator
            .start_playback("http://example.com/a.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, CastError::NoActiveSession));
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn status_without_session_fails() {
        let (coordinator, _) = coordinator_with(vec![], MockBehavior::default());
        assert!(matches!(
            coordinator.status().await.unwrap_err(),
            CastError::NoActiveSession
        ));
    }

    #[tokio::test]
    async fn connect_unknown_uuid_fails() {
        let uuid = Uuid::new_v4();
        let (coordinator, _) =
            coordinator_with(vec![device("TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();

        let err = coordinator.connect(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CastError::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn connect_returns_device_name() {
        let uuid = Uuid::new_v4();
        let (coordinator, _) =
            coordinator_with(vec![device("Living Room TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();

        let name = coordinator.connect(uuid).await.unwrap();
        assert_eq!(name, "Living Room TV");
        assert_eq!(
            coordinator.selected_device().await,
            Some("Living Room TV".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn direct_stream_runs_fixed_sequence_in_order() {
        let uuid = Uuid::new_v4();
        let (coordinator, calls) =
            coordinator_with(vec![device("TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator
            .start_playback("http://example.com/film.mkv")
            .await
            .unwrap();

        let recorded = calls.lock().clone();
        let sequence: Vec<&str> = recorded
            .iter()
            .map(|c| c.split(':').nth(1).unwrap())
            .collect();
        assert_eq!(
            sequence,
            vec![
                "stop_running_app",
                "launch_media_receiver",
                "receiver_ready",
                "load_media",
                "media_session_id",
                "control",
            ]
        );
        assert!(recorded
            .iter()
            .any(|c| c.contains("load_media:http://example.com/film.mkv")));
        assert!(recorded.iter().any(|c| c.contains("control:play")));
    }

    #[tokio::test(start_paused = true)]
    async fn receiver_readiness_is_polled() {
        let uuid = Uuid::new_v4();
        let behavior = MockBehavior {
            ready_after_polls: 3,
            ..Default::default()
        };
        let (coordinator, calls) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator
            .start_playback("http://example.com/a.mp4")
            .await
            .unwrap();

        let ready_polls = calls
            .lock()
            .iter()
            .filter(|c| c.contains("receiver_ready"))
            .count();
        assert_eq!(ready_polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_media_session_after_settle_still_plays() {
        let uuid = Uuid::new_v4();
        let behavior = MockBehavior {
            media_session_id: None,
            ..Default::default()
        };
        let (coordinator, calls) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator
            .start_playback("http://example.com/a.mp4")
            .await
            .unwrap();

        assert!(calls.lock().iter().any(|c| c.contains("control:play")));
    }

    #[tokio::test]
    async fn shared_video_uses_site_receiver() {
        let uuid = Uuid::new_v4();
        let (coordinator, calls) =
            coordinator_with(vec![device("TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator
            .start_playback("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        let recorded = calls.lock().clone();
        assert!(recorded
            .iter()
            .any(|c| c.contains("play_shared_video:dQw4w9WgXcQ")));
        assert!(!recorded.iter().any(|c| c.contains("launch_media_receiver")));
    }

    #[tokio::test(start_paused = true)]
    async fn namespace_failure_surfaces_as_receiver_unavailable() {
        let uuid = Uuid::new_v4();
        let behavior = MockBehavior {
            fail_load_with_namespace: true,
            ..Default::default()
        };
        let (coordinator, _) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        let err = coordinator
            .start_playback("http://example.com/a.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, CastError::ReceiverUnavailable(_)));
    }

    #[tokio::test]
    async fn control_without_media_session_fails() {
        let uuid = Uuid::new_v4();
        let behavior = MockBehavior {
            media_session_id: None,
            ..Default::default()
        };
        let (coordinator, _) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        let err = coordinator.control(ControlAction::Pause).await.unwrap_err();
        assert!(matches!(err, CastError::NoActiveMediaSession));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_control_still_reports_success() {
        let uuid = Uuid::new_v4();
        // Status never reaches PAUSED; the confirm loop must time out
        let behavior = MockBehavior {
            status: Some(playing_status()),
            ..Default::default()
        };
        let (coordinator, calls) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator.control(ControlAction::Pause).await.unwrap();
        assert!(calls.lock().iter().any(|c| c.contains("control:pause")));
    }

    #[tokio::test]
    async fn reconnect_replaces_session_and_targets_new_device() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let (coordinator, calls) = coordinator_with(
            vec![device("Old TV", first), device("New TV", second)],
            MockBehavior::default(),
        );
        coordinator.discover_devices().await.unwrap();

        coordinator.connect(first).await.unwrap();
        coordinator.connect(second).await.unwrap();
        coordinator.control(ControlAction::Play).await.unwrap();

        let recorded = calls.lock().clone();
        assert!(recorded.iter().any(|c| c.starts_with("New TV:control")));
        assert!(!recorded.iter().any(|c| c.starts_with("Old TV:")));
    }

    #[tokio::test]
    async fn seek_passes_through_position() {
        let uuid = Uuid::new_v4();
        let (coordinator, calls) =
            coordinator_with(vec![device("TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        coordinator.seek(42.5).await.unwrap();
        assert!(calls.lock().iter().any(|c| c.contains("seek:42.5")));
    }

    #[tokio::test]
    async fn status_reads_fresh_snapshot() {
        let uuid = Uuid::new_v4();
        let (coordinator, _) =
            coordinator_with(vec![device("TV", uuid)], MockBehavior::default());
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        let status = coordinator.status().await.unwrap();
        assert_eq!(status.player_state, "PLAYING");
        assert_eq!(status.duration, 120.0);
    }

    #[tokio::test]
    async fn status_without_media_is_no_media_status() {
        let uuid = Uuid::new_v4();
        let behavior = MockBehavior {
            status: None,
            ..Default::default()
        };
        let (coordinator, _) = coordinator_with(vec![device("TV", uuid)], behavior);
        coordinator.discover_devices().await.unwrap();
        coordinator.connect(uuid).await.unwrap();

        let err = coordinator.status().await.unwrap_err();
        assert!(matches!(err, CastError::NoMediaStatus));
    }
}
