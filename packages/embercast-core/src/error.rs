//! Centralized error types for the Embercast core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::cast::discovery::DiscoveryError;
use crate::cast::traits::TransportError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::MdnsDaemon(_) => "mdns_daemon_failed",
            Self::Browse(_) => "mdns_browse_failed",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "device_connect_failed",
            Self::Command(_) => "transport_command_failed",
            Self::UnsupportedNamespace(_) => "receiver_unavailable",
            Self::WorkerGone => "transport_worker_gone",
            Self::Timeout => "transport_timeout",
        }
    }
}

/// Application-wide error type for the Embercast server.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CastError {
    /// Receiver discovery failed (mDNS/network issues).
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Requested device uuid was not in the last discovery results.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No device has been connected yet.
    #[error("No active session")]
    NoActiveSession,

    /// The transport reports no live media session to control.
    #[error("No active media session")]
    NoActiveMediaSession,

    /// The transport has no playback status to report yet.
    #[error("No media status available")]
    NoMediaStatus,

    /// A playback operation failed on the receiver.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// The receiver application cannot accept media commands.
    #[error("{0}")]
    ReceiverUnavailable(String),

    /// Uploaded file was rejected (extension, size, or missing part).
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Server configuration error (missing required settings).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CastError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::NoActiveSession => "no_active_session",
            Self::NoActiveMediaSession => "no_active_media_session",
            Self::NoMediaStatus => "no_media_status",
            Self::Playback(_) => "playback_failed",
            Self::ReceiverUnavailable(_) => "receiver_unavailable",
            Self::InvalidUpload(_) => "invalid_upload",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) | Self::NoMediaStatus => StatusCode::NOT_FOUND,
            Self::NoActiveSession
            | Self::NoActiveMediaSession
            | Self::InvalidUpload(_)
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type CastResult<T> = Result<T, CastError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: &'static str,
    message: String,
}

impl IntoResponse for CastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            status: "error",
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DiscoveryError> for CastError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<TransportError> for CastError {
    fn from(err: TransportError) -> Self {
        match err {
            // Message matches what receivers without the media namespace produce
            TransportError::UnsupportedNamespace(_) => {
                Self::ReceiverUnavailable("Media receiver not available".into())
            }
            other => Self::Playback(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_maps_to_404() {
        let err = CastError::DeviceNotFound("abc".into());
        assert_eq!(err.code(), "device_not_found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_active_session_maps_to_400() {
        let err = CastError::NoActiveSession;
        assert_eq!(err.code(), "no_active_session");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn no_media_status_maps_to_404() {
        let err = CastError::NoMediaStatus;
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsupported_namespace_becomes_receiver_unavailable() {
        let err: CastError = TransportError::UnsupportedNamespace("urn:x-cast:media".into()).into();
        assert_eq!(err.code(), "receiver_unavailable");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Media receiver not available");
    }

    #[test]
    fn command_failure_becomes_playback_failed() {
        let err: CastError = TransportError::Command("load rejected".into()).into();
        assert_eq!(err.code(), "playback_failed");
    }
}
