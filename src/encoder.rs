//! Conversion of user-selected files into base64 payloads for providers.

use crate::error::{NovaError, Result};
use crate::image::ReferenceImage;
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

/// Fallback media type for files whose extension is not recognised.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A file handed over by the user, with its declared media type.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Display name (usually the file name).
    pub name: String,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Raw file contents.
    pub data: Arc<[u8]>,
}

impl SelectedFile {
    /// Creates a selected file from in-memory bytes.
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Returns true if the declared type is an image type.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// An image ready to be sent as a reference for editing.
///
/// Only [`encode`] creates one, so `encoded` is always the base64 form of
/// `data` without any `data:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    data: Arc<[u8]>,
    encoded: String,
    media_type: String,
}

impl UploadedImage {
    /// The original file bytes, kept for previews.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Base64 payload, no prefix.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Declared media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Returns the provider-facing part of this image.
    pub fn reference(&self) -> ReferenceImage {
        ReferenceImage {
            encoded: self.encoded.clone(),
            media_type: self.media_type.clone(),
        }
    }
}

/// Encodes a selected file. Non-image files are rejected with [`NovaError::FileType`].
pub fn encode(file: &SelectedFile) -> Result<UploadedImage> {
    if !file.is_image() {
        return Err(NovaError::FileType(file.media_type.clone()));
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(&file.data);
    tracing::debug!(
        name = %file.name,
        media_type = %file.media_type,
        bytes = file.data.len(),
        "encoded image"
    );

    Ok(UploadedImage {
        data: Arc::clone(&file.data),
        encoded,
        media_type: file.media_type.clone(),
    })
}

/// Guesses a media type from a path's extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("txt") => "text/plain",
        _ => UNKNOWN_MEDIA_TYPE,
    }
}

/// Reads a file from disk into a [`SelectedFile`].
///
/// Read failures become [`NovaError::Encode`].
pub async fn read_file(path: impl AsRef<Path>) -> Result<SelectedFile> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| NovaError::Encode(format!("{}: {e}", path.display())))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SelectedFile::new(name, media_type_for_path(path), data))
}

/// Reads and encodes an image file in one step.
pub async fn load(path: impl AsRef<Path>) -> Result<UploadedImage> {
    let file = read_file(path).await?;
    encode(&file)
}
