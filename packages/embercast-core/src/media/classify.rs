//! Media reference classification.
//!
//! Every incoming stream URL is classified into exactly one of two kinds:
//! a shared-video id (played through the video site's own receiver app)
//! or a direct stream URL (played through the default media receiver).
//! Classification is total: URLs that fail to parse or yield no video id
//! fall through to direct streaming.

use url::Url;

use crate::context::UrlBuilder;
use crate::media::store::content_type_for;

/// Path marker for locally stored uploads.
const UPLOADS_PATH_MARKER: &str = "/uploads/";

/// Shared-video hosts receiving id-extraction handling.
const SHARED_VIDEO_HOST: &str = "youtube.com";
const SHARED_VIDEO_SHORT_HOST: &str = "youtu.be";

/// A classified media reference.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaReference {
    /// A video on the shared-video site, identified by its id.
    SharedVideo { video_id: String },
    /// Any other URL, streamed to the default media receiver as-is.
    DirectStream {
        url: String,
        content_type: String,
        title: String,
    },
}

/// Classifies a raw URL into a [`MediaReference`].
///
/// URLs pointing at the local upload path are first rewritten to the
/// canonical public URL so the receiver fetches them from this server's
/// advertised address.
pub fn classify(raw_url: &str, urls: &UrlBuilder) -> MediaReference {
    if let Some(video_id) = extract_shared_video_id(raw_url) {
        return MediaReference::SharedVideo { video_id };
    }

    // Rewrite local upload references to the absolute public URL
    let url = match raw_url.split_once(UPLOADS_PATH_MARKER) {
        Some((_, filename)) => urls.upload_url(filename),
        None => raw_url.to_string(),
    };

    MediaReference::DirectStream {
        content_type: content_type_for(&url).to_string(),
        title: title_for(&url),
        url,
    }
}

/// Extracts a shared-video id from a URL, if it is one.
///
/// Handles the three well-known forms:
/// - `https://www.youtube.com/watch?v=<id>` (query parameter)
/// - `https://www.youtube.com/embed/<id>` (final path segment)
/// - `https://youtu.be/<id>` (path with leading slash stripped)
fn extract_shared_video_id(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?;

    if host == SHARED_VIDEO_HOST || host.ends_with(&format!(".{SHARED_VIDEO_HOST}")) {
        let path = parsed.path();
        if path.contains("watch") {
            return parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty());
        }
        if path.contains("embed") {
            return path
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && *s != "embed")
                .map(str::to_string);
        }
        return None;
    }

    if host == SHARED_VIDEO_SHORT_HOST {
        let id = parsed.path().trim_start_matches('/');
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    None
}

/// Title shown in receiver metadata: the final path segment, or the URL
/// itself when there is none.
fn title_for(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> UrlBuilder {
        UrlBuilder::new("192.168.1.10", 5000)
    }

    #[test]
    fn watch_url_extracts_query_id() {
        let reference = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &urls());
        assert_eq!(
            reference,
            MediaReference::SharedVideo {
                video_id: "dQw4w9WgXcQ".into()
            }
        );
    }

    #[test]
    fn watch_url_without_www_extracts_query_id() {
        let reference = classify("https://youtube.com/watch?v=abc123", &urls());
        assert_eq!(
            reference,
            MediaReference::SharedVideo {
                video_id: "abc123".into()
            }
        );
    }

    #[test]
    fn embed_url_extracts_final_segment() {
        let reference = classify("https://www.youtube.com/embed/dQw4w9WgXcQ", &urls());
        assert_eq!(
            reference,
            MediaReference::SharedVideo {
                video_id: "dQw4w9WgXcQ".into()
            }
        );
    }

    #[test]
    fn short_url_extracts_path() {
        let reference = classify("https://youtu.be/dQw4w9WgXcQ", &urls());
        assert_eq!(
            reference,
            MediaReference::SharedVideo {
                video_id: "dQw4w9WgXcQ".into()
            }
        );
    }

    #[test]
    fn shared_video_host_without_id_falls_through_to_direct() {
        let reference = classify("https://www.youtube.com/watch", &urls());
        assert!(matches!(reference, MediaReference::DirectStream { .. }));
    }

    #[test]
    fn unrelated_host_is_direct_stream_with_table_content_type() {
        let reference = classify("http://example.com/movies/film.mkv", &urls());
        assert_eq!(
            reference,
            MediaReference::DirectStream {
                url: "http://example.com/movies/film.mkv".into(),
                content_type: "video/x-matroska".into(),
                title: "film.mkv".into(),
            }
        );
    }

    #[test]
    fn unknown_extension_defaults_to_mp4() {
        let reference = classify("http://example.com/stream", &urls());
        match reference {
            MediaReference::DirectStream { content_type, .. } => {
                assert_eq!(content_type, "video/mp4");
            }
            other => panic!("expected DirectStream, got {other:?}"),
        }
    }

    #[test]
    fn upload_path_is_rewritten_to_public_url() {
        let reference = classify("http://localhost:5000/uploads/clip.webm", &urls());
        assert_eq!(
            reference,
            MediaReference::DirectStream {
                url: "http://192.168.1.10:5000/uploads/clip.webm".into(),
                content_type: "video/webm".into(),
                title: "clip.webm".into(),
            }
        );
    }

    #[test]
    fn relative_upload_path_is_rewritten() {
        let reference = classify("/uploads/movie.mp4", &urls());
        assert_eq!(
            reference,
            MediaReference::DirectStream {
                url: "http://192.168.1.10:5000/uploads/movie.mp4".into(),
                content_type: "video/mp4".into(),
                title: "movie.mp4".into(),
            }
        );
    }

    #[test]
    fn unparseable_url_is_still_classified() {
        let reference = classify("not a url at all", &urls());
        assert!(matches!(reference, MediaReference::DirectStream { .. }));
    }
}
