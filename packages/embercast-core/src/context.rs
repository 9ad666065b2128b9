//! Network configuration context for the casting server.
//!
//! This module provides [`NetworkContext`] which bundles network configuration
//! used across services. It supports both explicit configuration (for server
//! deployment) and auto-detection of the local IP.

use std::net::IpAddr;
#[cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;

/// Network configuration shared across services.
///
/// Bundles server address and local IP information that multiple services need
/// for constructing the public upload URLs handed to cast receivers.
///
/// # Modes
///
/// - **Explicit**: the bind port and advertise IP are specified in
///   configuration. Use [`NetworkContext::explicit`].
/// - **Auto-detect**: the local IP is detected from the system's network
///   interfaces. Use [`NetworkContext::auto_detect`].
#[derive(Clone)]
pub struct NetworkContext {
    /// Server port (initially 0 if auto-assigned, set when server starts).
    pub port: Arc<RwLock<u16>>,
    /// IP address that cast receivers can reach us at.
    pub local_ip: Arc<RwLock<String>>,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `bind_port` - Port to bind the server to (0 for auto-assign).
    /// * `advertise_ip` - IP address that cast receivers can reach us at.
    #[must_use]
    pub fn explicit(bind_port: u16, advertise_ip: IpAddr) -> Self {
        Self {
            port: Arc::new(RwLock::new(bind_port)),
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
        }
    }

    /// Creates a `NetworkContext` with auto-detection.
    ///
    /// # Errors
    ///
    /// Returns an error if IP detection fails.
    pub fn auto_detect(
        preferred_port: u16,
        ip_detector: Arc<dyn IpDetector>,
    ) -> Result<Self, NetworkError> {
        let local_ip = ip_detector.detect()?;
        Ok(Self {
            port: Arc::new(RwLock::new(preferred_port)),
            local_ip: Arc::new(RwLock::new(local_ip)),
        })
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(0, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
    }

    /// Returns the current port value.
    #[must_use]
    pub fn get_port(&self) -> u16 {
        *self.port.read()
    }

    /// Returns the current local IP.
    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }

    /// Sets the port once the server has bound its listener.
    pub fn set_port(&self, port: u16) {
        *self.port.write() = port;
    }

    /// Returns a `UrlBuilder` for the current network configuration.
    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(self.get_local_ip(), self.get_port())
    }

    /// Returns the public URL for an uploaded asset.
    #[must_use]
    pub fn upload_url(&self, filename: &str) -> String {
        self.url_builder().upload_url(filename)
    }
}

/// Trait for detecting the local IP address.
///
/// Different environments may need different detection strategies.
/// This trait allows injecting the appropriate detector.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Default IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    /// Creates a new `LocalIpDetector`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates a new `LocalIpDetector` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self::new())
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),
}

/// Builder for constructing URLs for the casting server.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    /// Creates a new `UrlBuilder` for the given server address.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL for the server (e.g., `http://192.168.1.100:5000`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Returns the public URL for an uploaded asset.
    #[must_use]
    pub fn upload_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.base_url(), filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct MockIpDetector {
        ip: String,
    }

    impl IpDetector for MockIpDetector {
        fn detect(&self) -> Result<String, NetworkError> {
            Ok(self.ip.clone())
        }
    }

    #[test]
    fn explicit_context_uses_provided_ip() {
        let ctx = NetworkContext::explicit(5000, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(ctx.get_local_ip(), "192.168.1.100");
        assert_eq!(ctx.get_port(), 5000);
    }

    #[test]
    fn auto_detect_context_uses_detector() {
        let detector = Arc::new(MockIpDetector {
            ip: "10.0.0.5".to_string(),
        });
        let ctx = NetworkContext::auto_detect(0, detector).unwrap();
        assert_eq!(ctx.get_local_ip(), "10.0.0.5");
    }

    #[test]
    fn set_port_is_visible_through_url_builder() {
        let ctx = NetworkContext::explicit(0, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)));
        ctx.set_port(5003);
        assert_eq!(
            ctx.upload_url("clip.mp4"),
            "http://192.168.1.100:5003/uploads/clip.mp4"
        );
    }

    #[test]
    fn url_builder_generates_absolute_upload_urls() {
        let builder = UrlBuilder::new("192.168.1.100", 5000);
        assert_eq!(builder.base_url(), "http://192.168.1.100:5000");
        assert_eq!(
            builder.upload_url("clip.mp4"),
            "http://192.168.1.100:5000/uploads/clip.mp4"
        );
    }
}
