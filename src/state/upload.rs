//! Holder for the (optional) reference image.

use crate::encoder::{self, SelectedFile, UploadedImage};
use crate::error::Result;
use crate::state::preview::{PreviewHandle, PreviewRegistry};
use std::sync::Arc;
use tokio::sync::watch;

/// An uploaded image together with its display metadata.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The encoded image sent to providers.
    pub image: UploadedImage,
    /// Original file name, for display.
    pub file_name: String,
    preview: Arc<PreviewHandle>,
}

impl Upload {
    /// URL of the preview for this upload.
    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }
}

/// Holds zero or one uploaded image.
///
/// Replacing or clearing the image drops the previous [`Upload`], which
/// releases its preview URL. Concurrent selections are last-write-wins: an
/// encode that finishes after a newer one simply replaces it.
#[derive(Debug)]
pub struct UploadState {
    tx: watch::Sender<Option<Upload>>,
    previews: PreviewRegistry,
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new(PreviewRegistry::new())
    }
}

impl UploadState {
    /// Creates an empty holder that allocates previews from `previews`.
    pub fn new(previews: PreviewRegistry) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, previews }
    }

    /// Replaces the held image, or clears it with `None`.
    pub fn set_image(&self, image: Option<(UploadedImage, String)>) {
        let upload = image.map(|(image, file_name)| {
            let preview = Arc::new(self.previews.create(Arc::clone(image.data())));
            Upload {
                image,
                file_name,
                preview,
            }
        });
        if let Some(ref upload) = upload {
            tracing::debug!(
                file_name = %upload.file_name,
                media_type = upload.image.media_type(),
                preview = upload.preview_url(),
                "reference image set"
            );
        }
        // The old value is dropped here, releasing its preview.
        drop(self.tx.send_replace(upload));
    }

    /// Encodes `file` and stores it. On error the held image is unchanged.
    pub fn select(&self, file: &SelectedFile) -> Result<()> {
        let image = encoder::encode(file)?;
        self.set_image(Some((image, file.name.clone())));
        Ok(())
    }

    /// Clears the held image.
    pub fn remove(&self) {
        if self.tx.borrow().is_some() {
            tracing::debug!("reference image removed");
        }
        drop(self.tx.send_replace(None));
    }

    /// Returns the current upload, if any.
    pub fn current(&self) -> Option<Upload> {
        self.tx.borrow().clone()
    }

    /// Returns the current encoded image, if any.
    pub fn image(&self) -> Option<UploadedImage> {
        self.tx.borrow().as_ref().map(|u| u.image.clone())
    }

    /// Returns the file name of the current image.
    pub fn file_name(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|u| u.file_name.clone())
    }

    /// Returns the preview URL of the current image.
    pub fn preview_url(&self) -> Option<String> {
        self.tx
            .borrow()
            .as_ref()
            .map(|u| u.preview_url().to_string())
    }

    /// Returns true if an image is held.
    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribes to upload changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Upload>> {
        self.tx.subscribe()
    }

    /// The registry previews are allocated from.
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NovaError;

    fn png(name: &str, bytes: &[u8]) -> SelectedFile {
        SelectedFile::new(name, "image/png", bytes.to_vec())
    }

    #[test]
    fn test_select_sets_image_and_preview() {
        let state = UploadState::default();
        state.select(&png("cat.png", &[1, 2, 3])).unwrap();

        let upload = state.current().unwrap();
        assert_eq!(upload.file_name, "cat.png");
        assert_eq!(upload.image.encoded(), "AQID");
        assert_eq!(
            state.previews().resolve(upload.preview_url()).as_deref(),
            Some(&[1u8, 2, 3][..])
        );
    }

    #[test]
    fn test_non_image_leaves_state_unchanged() {
        let state = UploadState::default();
        state.select(&png("cat.png", &[1, 2, 3])).unwrap();
        let before = state.image();

        let err = state
            .select(&SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()))
            .unwrap_err();
        assert!(matches!(err, NovaError::FileType(_)));
        assert_eq!(state.image(), before);
        assert_eq!(state.file_name().as_deref(), Some("cat.png"));
    }

    #[test]
    fn test_non_image_on_empty_state() {
        let state = UploadState::default();
        assert!(state
            .select(&SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()))
            .is_err());
        assert!(!state.is_set());
        assert_eq!(state.previews().live_count(), 0);
    }

    #[test]
    fn test_replacing_releases_previous_preview() {
        let state = UploadState::default();
        for i in 0..5u8 {
            state.select(&png(&format!("{i}.png"), &[i])).unwrap();
            assert_eq!(state.previews().live_count(), 1);
        }
        assert_eq!(state.file_name().as_deref(), Some("4.png"));
    }

    #[test]
    fn test_remove_releases_preview() {
        let state = UploadState::default();
        state.select(&png("cat.png", &[1])).unwrap();
        let url = state.preview_url().unwrap();

        state.remove();
        assert!(!state.is_set());
        assert!(state.preview_url().is_none());
        assert!(state.previews().resolve(&url).is_none());
        assert_eq!(state.previews().live_count(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        // Two encodes started in order A, B but finishing B, A: A wins.
        let state = UploadState::default();
        let a = encoder::encode(&png("a.png", &[1])).unwrap();
        let b = encoder::encode(&png("b.png", &[2])).unwrap();

        state.set_image(Some((b, "b.png".into())));
        state.set_image(Some((a, "a.png".into())));

        assert_eq!(state.file_name().as_deref(), Some("a.png"));
        assert_eq!(state.previews().live_count(), 1);
    }

    #[test]
    fn test_subscribers_notified() {
        let state = UploadState::default();
        let mut rx = state.subscribe();

        state.select(&png("cat.png", &[1])).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_some());

        state.remove();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }
}
