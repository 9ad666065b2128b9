//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `EMBERCAST_BIND_PORT`
    pub bind_port: u16,

    /// IP address to advertise to receiver devices.
    /// This should be the IP that receivers can reach to fetch uploads.
    /// If not specified, auto-detection will be attempted.
    /// Override: `EMBERCAST_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Directory for uploaded media files.
    /// Override: `EMBERCAST_UPLOAD_DIR`
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,

    /// How long each mDNS discovery pass runs, in seconds.
    pub discovery_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 5000,
            advertise_ip: None,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024 * 1024,
            discovery_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EMBERCAST_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("EMBERCAST_ADVERTISE_IP") {
            if let Ok(ip) = val.parse() {
                self.advertise_ip = Some(ip);
            }
        }

        if let Ok(val) = std::env::var("EMBERCAST_UPLOAD_DIR") {
            if !val.is_empty() {
                self.upload_dir = PathBuf::from(val);
            }
        }
    }

    /// Converts to embercast-core's Config type.
    pub fn to_core_config(&self) -> embercast_core::Config {
        embercast_core::Config {
            preferred_port: self.bind_port,
            discovery_timeout_secs: self.discovery_timeout_secs,
            max_upload_bytes: self.max_upload_bytes,
            upload_dir: self.upload_dir.clone(),
            ..Default::default()
        }
    }
}
