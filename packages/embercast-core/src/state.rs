//! Core application configuration.
//!
//! All fields have sensible defaults matching the original deployment:
//! port 5000, an `uploads/` storage root, and a 16 GiB upload cap.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum upload size: 16 GiB.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024 * 1024;

/// Configuration for the Embercast application.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP server (0 = auto-allocate).
    pub preferred_port: u16,

    // Discovery
    /// How long a discovery pass browses for receivers (seconds).
    pub discovery_timeout_secs: u64,

    // Media store
    /// Directory where uploaded media files are stored.
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,

    // Playback sequencing
    /// Upper bound on waiting for the launched receiver app to become ready (milliseconds).
    pub receiver_ready_timeout_ms: u64,

    /// Interval between readiness/confirmation polls (milliseconds).
    pub receiver_poll_interval_ms: u64,

    /// Settle window after loading media, during which a media session id
    /// is awaited before the explicit play command (milliseconds).
    pub media_settle_timeout_ms: u64,

    /// Upper bound on waiting for a control action to be reflected in
    /// transport status before reporting success anyway (seconds).
    pub control_confirm_timeout_secs: u64,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.discovery_timeout_secs == 0 {
            return Err("discovery_timeout_secs must be >= 1".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be >= 1".to_string());
        }
        if self.receiver_poll_interval_ms == 0 {
            return Err("receiver_poll_interval_ms must be >= 1 (poll loop would spin)".to_string());
        }
        if self.receiver_ready_timeout_ms == 0 {
            return Err("receiver_ready_timeout_ms must be >= 1".to_string());
        }
        Ok(())
    }

    /// Discovery browse window as a [`Duration`].
    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// Receiver readiness bound as a [`Duration`].
    #[must_use]
    pub fn receiver_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.receiver_ready_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn receiver_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receiver_poll_interval_ms)
    }

    /// Media settle window as a [`Duration`].
    #[must_use]
    pub fn media_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.media_settle_timeout_ms)
    }

    /// Control confirmation bound as a [`Duration`].
    #[must_use]
    pub fn control_confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.control_confirm_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 5000,
            discovery_timeout_secs: 10,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            receiver_ready_timeout_ms: 5000,
            receiver_poll_interval_ms: 200,
            media_settle_timeout_ms: 2000,
            control_confirm_timeout_secs: 5,
        }
    }
}
