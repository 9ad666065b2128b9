//! Shared data model for cast devices and playback.

use std::net::IpAddr;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

/// Immutable snapshot of a discovered receiver device.
///
/// Only `name` and `uuid` appear in API responses; the address and port
/// are transport details.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    /// Friendly name from the device's mDNS TXT record.
    pub name: String,
    /// Stable device identifier.
    pub uuid: Uuid,
    /// Address to open the cast connection against.
    #[serde(skip)]
    pub addr: IpAddr,
    /// Cast protocol port (usually 8009).
    #[serde(skip)]
    pub port: u16,
}

/// Point-in-time playback status read from the transport. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    /// Receiver player state (`PLAYING`, `PAUSED`, `BUFFERING`, `IDLE`).
    pub player_state: String,
    /// Current playback position in seconds.
    pub current_time: f64,
    /// Media duration in seconds (0 when unknown).
    pub duration: f64,
    /// Receiver volume level (0.0 - 1.0).
    pub volume_level: f32,
    /// Receiver mute state.
    pub volume_muted: bool,
}

/// Playback control actions accepted by `/control/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Play,
    Pause,
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }

    /// Player state this action should settle into, used when polling
    /// the transport to confirm the action took effect.
    pub fn expected_player_state(&self) -> &'static str {
        match self {
            Self::Play => "PLAYING",
            Self::Pause => "PAUSED",
            Self::Stop => "IDLE",
        }
    }
}

impl FromStr for ControlAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Load request for the default media receiver.
///
/// Loaded with streamType=BUFFERED and autoplay; the title surfaces in
/// the receiver's on-screen metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaLoad {
    pub url: String,
    pub content_type: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_action_parses_known_values() {
        assert_eq!("play".parse(), Ok(ControlAction::Play));
        assert_eq!("pause".parse(), Ok(ControlAction::Pause));
        assert_eq!("stop".parse(), Ok(ControlAction::Stop));
    }

    #[test]
    fn control_action_rejects_unknown_values() {
        assert!("rewind".parse::<ControlAction>().is_err());
        assert!("PLAY".parse::<ControlAction>().is_err());
        assert!("".parse::<ControlAction>().is_err());
    }

    #[test]
    fn device_descriptor_serializes_name_and_uuid_only() {
        let device = DeviceDescriptor {
            name: "Living Room".into(),
            uuid: Uuid::nil(),
            addr: "192.168.1.50".parse().unwrap(),
            port: 8009,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["name"], "Living Room");
        assert!(json.get("addr").is_none());
        assert!(json.get("port").is_none());
    }
}
