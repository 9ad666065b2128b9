//! JSON response helpers.
//!
//! Every API endpoint answers with a JSON object carrying a `status`
//! discriminator: `"success"` or `"error"`. Error bodies additionally
//! carry a machine-readable `error` code and a human `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// A success response merged with the given payload object.
///
/// Non-object payloads are wrapped under a `data` key.
pub fn api_success(payload: Value) -> Response {
    let body = match payload {
        Value::Object(mut map) => {
            map.insert("status".to_string(), Value::String("success".into()));
            Value::Object(map)
        }
        other => json!({ "status": "success", "data": other }),
    };
    Json(body).into_response()
}

/// An error response with the given HTTP status, error code, and message.
pub fn api_error(status: StatusCode, code: &'static str, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "status": "error",
            "error": code,
            "message": message.to_string(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_payload_keeps_fields_and_adds_status() {
        let response = api_success(json!({ "device": "TV" }));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn error_carries_given_status() {
        let response = api_error(StatusCode::BAD_REQUEST, "invalid_request", "bad");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
