//! mDNS-based cast receiver discovery.
//!
//! Browses for `_googlecast._tcp.local.` services and builds device
//! descriptors from the resolved records.
//!
//! # Key Design Points
//!
//! - Uses resolved record data (IP from SRV/A answers) as primary source
//! - Device identity comes from the TXT `id` record (32-hex uuid)
//! - Calls `stop_browse()` after the window to avoid accumulating daemon work
//! - Deduplicates by uuid; a receiver answering on several interfaces
//!   yields one descriptor

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use mdns_sd::{ResolvedService, ScopedIp, ServiceDaemon, ServiceEvent};
use tokio::time::timeout;
use uuid::Uuid;

use crate::cast::types::DeviceDescriptor;

/// Cast mDNS service type (note: trailing dot is required by mdns-sd).
const CAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// Cast protocol port used when the SRV record carries none.
const DEFAULT_CAST_PORT: u16 = 8009;

/// Errors that can occur during receiver discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The mDNS daemon could not be created or driven.
    #[error("mDNS daemon error: {0}")]
    MdnsDaemon(String),

    /// Browsing for the cast service type failed.
    #[error("mDNS browse error: {0}")]
    Browse(String),
}

/// Creates a new mDNS service daemon.
///
/// This should be called once and the daemon reused across discovery calls.
/// The daemon spawns a background thread for mDNS operations.
pub fn create_daemon() -> Result<ServiceDaemon, DiscoveryError> {
    ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))
}

/// Discovers cast receivers on the local network.
///
/// Browses for `_googlecast._tcp.local.` services for up to
/// `browse_timeout` and returns whatever resolved in that window.
///
/// # Arguments
///
/// * `daemon` - Shared mDNS service daemon (reused across discovery calls)
/// * `browse_timeout` - How long to browse for services
pub async fn discover_mdns(
    daemon: &Arc<ServiceDaemon>,
    browse_timeout: Duration,
) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
    log::debug!(
        "[mDNS] Starting discovery, browse timeout: {}ms",
        browse_timeout.as_millis()
    );

    let receiver = daemon
        .browse(CAST_SERVICE_TYPE)
        .map_err(|e| DiscoveryError::Browse(e.to_string()))?;

    let mut discovered: HashMap<Uuid, DeviceDescriptor> = HashMap::new();

    // Collect resolved services within the window
    let start = std::time::Instant::now();
    while start.elapsed() < browse_timeout {
        let remaining = browse_timeout.saturating_sub(start.elapsed());

        match timeout(remaining, async { receiver.recv_async().await }).await {
            Ok(Ok(event)) => {
                if let ServiceEvent::ServiceResolved(info) = event {
                    log::trace!("[mDNS] Service resolved: {:?}", info.fullname);

                    if let Some(device) = parse_mdns_service(&info) {
                        log::debug!(
                            "[mDNS] Discovered receiver: name={}, uuid={}, addr={}",
                            device.name,
                            device.uuid,
                            device.addr
                        );
                        discovered.insert(device.uuid, device);
                    }
                }
            }
            Ok(Err(e)) => {
                log::debug!("[mDNS] Receiver channel closed: {:?}", e);
                break;
            }
            Err(_) => {
                // Window elapsed - normal termination
                break;
            }
        }
    }

    // Stop browsing to avoid accumulating daemon work
    if let Err(e) = daemon.stop_browse(CAST_SERVICE_TYPE) {
        log::warn!("[mDNS] Failed to stop browse: {:?}", e);
    }

    let devices: Vec<_> = discovered.into_values().collect();
    log::debug!(
        "[mDNS] Discovery complete: {} receiver(s) found",
        devices.len()
    );

    Ok(devices)
}

/// Parses a resolved mDNS service into a `DeviceDescriptor`.
///
/// Friendly name comes from the TXT `fn` record (falling back to the
/// service fullname), identity from the TXT `id` record.
fn parse_mdns_service(info: &ResolvedService) -> Option<DeviceDescriptor> {
    // Prefer IPv4; the cast TLS endpoint listens there
    let addr: IpAddr = info.addresses.iter().find_map(|scoped| match scoped {
        ScopedIp::V4(v4) => Some(IpAddr::V4(*v4.addr())),
        _ => None,
    })?;

    let uuid = info
        .txt_properties
        .get("id")
        .and_then(|p| parse_device_uuid(p.val_str()))?;

    let name = info
        .txt_properties
        .get("fn")
        .map(|p| p.val_str().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| info.fullname.clone());

    let port = if info.port > 0 {
        info.port
    } else {
        DEFAULT_CAST_PORT
    };

    Some(DeviceDescriptor {
        name,
        uuid,
        addr,
        port,
    })
}

/// Parses the TXT `id` value into a [`Uuid`].
///
/// Receivers advertise a 32-hex string without dashes; `Uuid::parse_str`
/// accepts both that and the dashed form.
fn parse_device_uuid(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_simple_hex_format() {
        let uuid = parse_device_uuid("a58cd35ff2174a3fb13bd41f20afdd0e");
        assert_eq!(
            uuid,
            Some(Uuid::parse_str("a58cd35f-f217-4a3f-b13b-d41f20afdd0e").unwrap())
        );
    }

    #[test]
    fn parse_uuid_dashed_format() {
        let uuid = parse_device_uuid("a58cd35f-f217-4a3f-b13b-d41f20afdd0e");
        assert!(uuid.is_some());
    }

    #[test]
    fn parse_uuid_tolerates_whitespace() {
        assert!(parse_device_uuid(" a58cd35ff2174a3fb13bd41f20afdd0e ").is_some());
    }

    #[test]
    fn parse_uuid_rejects_garbage() {
        assert_eq!(parse_device_uuid("not-a-uuid"), None);
        assert_eq!(parse_device_uuid(""), None);
    }
}
