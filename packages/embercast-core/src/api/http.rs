//! HTTP API routes.
//!
//! The control surface for the whole system: device discovery and
//! selection, playback control, uploads, and file serving all live here.
//! Responses follow the `status: success|error` JSON convention from
//! [`super::response`].

use std::net::SocketAddr;
use std::str::FromStr;

use axum::extract::{ConnectInfo, DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api::response::{api_error, api_success};
use crate::api::{range, AppState};
use crate::cast::types::ControlAction;
use crate::media::store::content_type_for;

// ─────────────────────────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConnectRequest {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamRequest {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeekRequest {
    time: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the API router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.read().max_upload_bytes as usize;

    Router::new()
        .route("/devices", get(list_devices))
        .route("/connect", post(connect_device))
        .route("/stream", post(start_stream))
        .route("/control/{action}", post(control_playback))
        .route("/seek", post(seek_playback))
        .route("/status", get(playback_status))
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/uploads/{filename}", get(serve_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Device handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /devices - runs a discovery pass and returns the device list.
async fn list_devices(State(state): State<AppState>) -> Response {
    match state.coordinator.discover_devices().await {
        Ok(devices) => Json(devices).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /connect - selects a device from the last discovery by uuid.
async fn connect_device(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> Response {
    let raw = match request.uuid {
        Some(raw) => raw,
        None => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "No device uuid provided",
            )
        }
    };
    let uuid = match Uuid::parse_str(&raw) {
        Ok(uuid) => uuid,
        Err(_) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                format!("Invalid device uuid: {raw}"),
            )
        }
    };

    match state.coordinator.connect(uuid).await {
        Ok(name) => api_success(json!({
            "message": format!("Connected to {name}"),
            "device": name,
        })),
        Err(e) => e.into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /stream - classifies a URL and starts playback on the selected device.
async fn start_stream(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Response {
    let url = match request.url {
        Some(url) if !url.is_empty() => url,
        _ => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "No URL provided",
            )
        }
    };

    match state.coordinator.start_playback(&url).await {
        Ok(message) => api_success(json!({ "message": message })),
        Err(e) => e.into_response(),
    }
}

/// POST /control/{action} - play, pause, or stop.
async fn control_playback(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Response {
    let action = match ControlAction::from_str(&action) {
        Ok(action) => action,
        Err(()) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                format!("Invalid action: {action}"),
            )
        }
    };

    match state.coordinator.control(action).await {
        Ok(()) => api_success(json!({
            "action": action.as_str(),
            "message": format!("{action} requested"),
        })),
        Err(e) => e.into_response(),
    }
}

/// POST /seek - seeks to an absolute position in seconds.
async fn seek_playback(
    State(state): State<AppState>,
    Json(request): Json<SeekRequest>,
) -> Response {
    let time = match request.time {
        Some(time) => time,
        None => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "No time provided",
            )
        }
    };

    match state.coordinator.seek(time).await {
        Ok(()) => api_success(json!({ "message": format!("Seeked to {time}s") })),
        Err(e) => e.into_response(),
    }
}

/// GET /status - current playback status of the selected device.
async fn playback_status(State(state): State<AppState>) -> Response {
    match state.coordinator.status().await {
        Ok(status) => api_success(json!({
            "player_state": status.player_state,
            "current_time": status.current_time,
            "duration": status.duration,
            "volume_level": status.volume_level,
            "volume_muted": status.volume_muted,
        })),
        Err(e) => e.into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upload handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /upload - multipart file upload into the media store.
async fn upload_file(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, bytes::Bytes)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_upload",
                    format!("Malformed multipart body: {e}"),
                )
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_upload",
                    "File part has no filename",
                )
            }
        };
        match field.bytes().await {
            Ok(data) => {
                upload = Some((filename, data));
                break;
            }
            Err(e) => {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_upload",
                    format!("Failed to read upload: {e}"),
                )
            }
        }
    }

    let (filename, data) = match upload {
        Some(upload) => upload,
        None => {
            return api_error(StatusCode::BAD_REQUEST, "invalid_upload", "No file part")
        }
    };

    log::info!("[Api] Upload {} ({} bytes) from {}", filename, data.len(), addr);
    match state.store.save(&filename, &data).await {
        Ok(stored) => {
            let url = state.network.upload_url(&stored);
            api_success(json!({
                "message": "File uploaded successfully",
                "filename": stored,
                "url": url,
            }))
        }
        Err(e) => e.into_response(),
    }
}

/// GET /files - lists stored uploads with their public URLs.
async fn list_files(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(files) => {
            let files: Vec<_> = files
                .into_iter()
                .map(|name| {
                    let url = state.network.upload_url(&name);
                    json!({ "filename": name, "url": url })
                })
                .collect();
            api_success(json!({ "files": files }))
        }
        Err(e) => e.into_response(),
    }
}

/// GET /uploads/{filename} - serves a stored file with byte-range support.
async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = match state.store.resolve(&filename) {
        Some(path) => path,
        None => {
            return api_error(
                StatusCode::NOT_FOUND,
                "file_not_found",
                format!("No such file: {filename}"),
            )
        }
    };

    match range::serve_file_range(&path, content_type_for(&filename), &headers).await {
        Ok(response) => response,
        Err(StatusCode::NOT_FOUND) => api_error(
            StatusCode::NOT_FOUND,
            "file_not_found",
            format!("No such file: {filename}"),
        ),
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::RwLock;

    use crate::cast::discovery::DiscoveryError;
    use crate::cast::traits::{CastConnection, CastDiscovery, CastTransport, TransportResult};
    use crate::cast::types::DeviceDescriptor;
    use crate::context::NetworkContext;
    use crate::media::MediaStore;
    use crate::services::SessionCoordinator;
    use crate::state::Config;

    /// Client that fails the test if the handler reaches the transport layer.
    struct UnreachableClient;

    #[async_trait]
    impl CastDiscovery for UnreachableClient {
        async fn discover(
            &self,
            _timeout: Duration,
        ) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
            panic!("discovery must not be reached");
        }
    }

    #[async_trait]
    impl CastTransport for UnreachableClient {
        async fn connect(
            &self,
            _device: &DeviceDescriptor,
        ) -> TransportResult<Box<dyn CastConnection>> {
            panic!("transport must not be reached");
        }
    }

    fn state() -> AppState {
        let config = Arc::new(RwLock::new(Config::default()));
        let network = NetworkContext::for_test();
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(UnreachableClient),
            network.clone(),
            config.clone(),
        ));
        AppState {
            coordinator,
            store: Arc::new(MediaStore::new("uploads", 1024)),
            network,
            config,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn seek_without_time_is_rejected_at_the_boundary() {
        let response = seek_playback(State(state()), Json(SeekRequest { time: None })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        // invalid_request, not no_active_session: validation fires before
        // the coordinator is consulted
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["message"], "No time provided");
    }

    #[tokio::test]
    async fn unknown_control_action_is_rejected_at_the_boundary() {
        let response = control_playback(State(state()), Path("rewind".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["message"], "Invalid action: rewind");
    }

    #[tokio::test]
    async fn stream_without_url_is_rejected_at_the_boundary() {
        let response = start_stream(State(state()), Json(StreamRequest { url: None })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["message"], "No URL provided");
    }

    #[tokio::test]
    async fn connect_with_malformed_uuid_is_rejected_at_the_boundary() {
        let request = ConnectRequest {
            uuid: Some("not-a-uuid".to_string()),
        };
        let response = connect_device(State(state()), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_request");
    }
}
