//! Upload store: validation, sanitization, and file persistence.
//!
//! Filenames are sanitized before use as storage keys; a sanitized name
//! maps 1:1 to a file under the storage root and duplicate uploads with
//! the same name overwrite. Only a fixed set of video extensions is
//! accepted.

use std::path::{Path, PathBuf};

use crate::error::{CastError, CastResult};

/// Video extensions accepted for upload, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "webm"];

/// Returns whether a filename is acceptable for upload.
///
/// The name must contain a dot and its lowercased extension must be in
/// the allow-set.
pub fn is_allowed_filename(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Sanitizes a client-supplied filename into a safe storage key.
///
/// Strips directory components (both separator styles), replaces
/// anything outside `[A-Za-z0-9._-]` with `_`, and trims leading dots so
/// the result can never traverse out of the storage root or hide itself.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// Returns the content type for a filename based on its extension.
///
/// Unknown or missing extensions default to `video/mp4`.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "video/mp4",
    }
}

/// File store for uploaded media, rooted at a managed directory.
pub struct MediaStore {
    root: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    /// Creates a store over the given root directory.
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configured size cap in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Creates the storage root if it does not exist yet.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Validates, sanitizes, and persists an upload.
    ///
    /// Returns the sanitized filename the asset is stored (and served)
    /// under. An existing file with the same sanitized name is
    /// overwritten.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> CastResult<String> {
        if data.len() as u64 > self.max_bytes {
            return Err(CastError::InvalidUpload(format!(
                "File exceeds maximum size of {} bytes",
                self.max_bytes
            )));
        }

        let filename = sanitize_filename(original_name);
        if filename.is_empty() {
            return Err(CastError::InvalidUpload("Empty filename".into()));
        }
        if !is_allowed_filename(&filename) {
            return Err(CastError::InvalidUpload(format!(
                "File type not allowed: {original_name}"
            )));
        }

        let path = self.root.join(&filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CastError::Internal(format!("Failed to store upload: {e}")))?;

        log::info!(
            "[Store] Saved upload: {} ({} bytes)",
            filename,
            data.len()
        );
        Ok(filename)
    }

    /// Lists stored asset filenames (allowed extensions only).
    pub async fn list(&self) -> CastResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // A store that was never written to has no directory yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CastError::Internal(format!("Failed to list uploads: {e}"))),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CastError::Internal(format!("Failed to list uploads: {e}")))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if is_allowed_filename(name) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Resolves a requested filename to an on-disk path.
    ///
    /// Only names that survive sanitization unchanged resolve; anything
    /// else (traversal attempts, separators) yields `None`.
    #[must_use]
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty() || sanitize_filename(filename) != filename {
            return None;
        }
        Some(self.root.join(filename))
    }
}
