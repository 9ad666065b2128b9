//! HTTP range request handling for stored media files.
//!
//! Receivers fetch uploads with `Range` headers to seek inside large
//! video files, so partial content support is required for playback to
//! work at all.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;

/// Parses an HTTP Range header value like `bytes=0-1023`.
///
/// Returns `(start, end, length)` clamped to the available size. An
/// omitted end means "through end of file"; the suffix form `bytes=-N`
/// means the final N bytes (receivers probe with `bytes=-1`).
pub fn parse_range_header(range: &str, available_size: u64) -> (u64, u64, u64) {
    let range = range.trim_start_matches("bytes=");
    let parts: Vec<&str> = range.split('-').collect();

    if parts.first().is_some_and(|s| s.is_empty()) {
        if let Some(suffix) = parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
            let length = suffix.min(available_size);
            let start = available_size - length;
            return (start, available_size.saturating_sub(1), length);
        }
    }

    let start = parts
        .first()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let end = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(available_size.saturating_sub(1));

    let end = end.min(available_size.saturating_sub(1));
    let length = if end >= start { end - start + 1 } else { 0 };

    (start, end, length)
}

/// Validates range bounds against the available size.
pub fn validate_range_bounds(
    start: u64,
    end: u64,
    available_size: u64,
) -> Result<(u64, u64, u64), StatusCode> {
    if available_size == 0 || start >= available_size || end < start {
        return Err(StatusCode::RANGE_NOT_SATISFIABLE);
    }
    let end = end.min(available_size - 1);
    Ok((start, end, end - start + 1))
}

/// Extracts the Range header from a request, if present and readable.
pub fn extract_range_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Serves a file with byte-range support.
///
/// Responds 206 with `Content-Range` when a Range header is present and
/// satisfiable, 200 with the full body otherwise, 416 for unsatisfiable
/// ranges, and 404 when the file cannot be opened.
pub async fn serve_file_range(
    path: &Path,
    content_type: &str,
    headers: &HeaderMap,
) -> Result<Response, StatusCode> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let total_size = file
        .metadata()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .len();

    if let Some(range) = extract_range_header(headers) {
        let (start, end, _) = parse_range_header(&range, total_size);
        let (start, end, length) = validate_range_bounds(start, end, total_size)?;

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let stream = ReaderStream::new(file.take(length));

        return Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, content_type)
            .header(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{total_size}"),
            )
            .header(header::CONTENT_LENGTH, length)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(stream))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR);
    }

    let stream = ReaderStream::new(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, total_size)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounded_range() {
        assert_eq!(parse_range_header("bytes=0-1023", 4096), (0, 1023, 1024));
    }

    #[test]
    fn parses_open_ended_range() {
        assert_eq!(parse_range_header("bytes=1024-", 4096), (1024, 4095, 3072));
    }

    #[test]
    fn clamps_end_to_available() {
        assert_eq!(parse_range_header("bytes=0-9999", 100), (0, 99, 100));
    }

    #[test]
    fn parses_suffix_range() {
        assert_eq!(parse_range_header("bytes=-500", 4096), (3596, 4095, 500));
        assert_eq!(parse_range_header("bytes=-1", 4096), (4095, 4095, 1));
    }

    #[test]
    fn suffix_longer_than_file_is_clamped_to_full() {
        assert_eq!(parse_range_header("bytes=-500", 100), (0, 99, 100));
    }

    #[test]
    fn malformed_range_defaults_to_full() {
        assert_eq!(parse_range_header("bytes=abc-def", 100), (0, 99, 100));
    }

    #[test]
    fn rejects_start_past_end_of_file() {
        assert_eq!(
            validate_range_bounds(100, 199, 100),
            Err(StatusCode::RANGE_NOT_SATISFIABLE)
        );
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(
            validate_range_bounds(0, 0, 0),
            Err(StatusCode::RANGE_NOT_SATISFIABLE)
        );
    }

    #[test]
    fn accepts_valid_bounds() {
        assert_eq!(validate_range_bounds(0, 49, 100), Ok((0, 49, 50)));
        assert_eq!(validate_range_bounds(50, 99, 100), Ok((50, 99, 50)));
    }

    #[tokio::test]
    async fn serves_partial_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, vec![0u8; 256]).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, "bytes=0-127".parse().unwrap());

        let response = serve_file_range(&path, "video/mp4", &headers)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 0-127/256"
        );
    }

    #[tokio::test]
    async fn serves_full_file_without_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, vec![0u8; 64]).await.unwrap();

        let response = serve_file_range(&path, "video/mp4", &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "64");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let result = serve_file_range(
            Path::new("/nonexistent/clip.mp4"),
            "video/mp4",
            &HeaderMap::new(),
        )
        .await;
        assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
    }
}
