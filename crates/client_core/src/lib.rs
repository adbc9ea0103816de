use std::sync::Arc;

use shared::domain::{ImageId, ImageRecord};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod candidate;
pub mod events;
pub mod transport;
pub mod validation;

pub use candidate::{CandidateFile, StagedSummary};
pub use events::{GalleryEvent, Notice, NoticeLevel};
pub use transport::{GalleryBackend, HttpGalleryBackend, TransportError};
pub use validation::{validate_candidate, ValidationError, IMAGE_MIME_PREFIX, MAX_UPLOAD_BYTES};

const LIST_FAILED: &str = "Failed to load images";
const UPLOAD_FAILED: &str = "Failed to upload image";
const DELETE_FAILED: &str = "Failed to delete image";
const UPLOAD_SUCCEEDED: &str = "Image uploaded and analyzed successfully";
const DELETE_SUCCEEDED: &str = "Image deleted successfully";

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Please select an image first")]
    NothingStaged,
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: TransportError,
    },
}

#[derive(Default)]
struct GalleryState {
    images: Vec<ImageRecord>,
    staged: Option<Arc<CandidateFile>>,
    uploading: bool,
}

/// Owns the in-memory image collection and the staged upload, and keeps
/// them in step with the backend.
///
/// Every operation reports its outcome twice: as a returned `Result` and as a
/// [`GalleryEvent::Notice`] for whoever renders toasts. State changes are
/// published on the same channel so a front end can re-render from events
/// alone.
pub struct GalleryController {
    backend: Arc<dyn GalleryBackend>,
    inner: Mutex<GalleryState>,
    events: broadcast::Sender<GalleryEvent>,
}

impl GalleryController {
    pub fn new(backend: Arc<dyn GalleryBackend>) -> Self {
        let (events, _) = broadcast::channel(events::EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            inner: Mutex::new(GalleryState::default()),
            events,
        }
    }

    /// Controller backed by the HTTP API at `server_url`.
    pub fn connect(server_url: &str) -> Result<Self, TransportError> {
        let backend = HttpGalleryBackend::new(server_url)?;
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    pub async fn images(&self) -> Vec<ImageRecord> {
        self.inner.lock().await.images.clone()
    }

    pub async fn staged(&self) -> Option<Arc<CandidateFile>> {
        self.inner.lock().await.staged.clone()
    }

    pub async fn is_uploading(&self) -> bool {
        self.inner.lock().await.uploading
    }

    /// Replaces the collection with the backend's current list.
    pub async fn list_images(&self) -> Result<usize, GalleryError> {
        let records = match self.backend.list_images().await {
            Ok(records) => records,
            Err(source) => return Err(self.fail(LIST_FAILED, source)),
        };

        let mut images: Vec<ImageRecord> = Vec::with_capacity(records.len());
        for record in records {
            if images.iter().any(|known| known.id == record.id) {
                warn!(id = %record.id, "gallery: backend listed duplicate image id; keeping first");
                continue;
            }
            images.push(record.completed());
        }

        let count = images.len();
        self.inner.lock().await.images = images.clone();
        info!(count, "gallery: loaded images");
        self.emit(GalleryEvent::ImagesChanged(images));
        Ok(count)
    }

    /// Validates `file` and stages it, replacing any earlier candidate.
    /// A rejected file leaves the current candidate in place.
    pub async fn select_file(&self, file: CandidateFile) -> Result<StagedSummary, GalleryError> {
        if let Err(err) = validate_candidate(&file) {
            debug!(
                file_name = %file.file_name,
                size = file.size(),
                "gallery: rejected candidate: {err}"
            );
            self.notify(Notice::error(err.to_string()));
            return Err(err.into());
        }

        let summary = file.summary();
        self.inner.lock().await.staged = Some(Arc::new(file));
        debug!(file_name = %summary.file_name, size = summary.size, "gallery: staged candidate");
        self.emit(GalleryEvent::StagedChanged(Some(summary.clone())));
        Ok(summary)
    }

    pub async fn clear_staged(&self) {
        let cleared = self.inner.lock().await.staged.take().is_some();
        if cleared {
            self.emit(GalleryEvent::StagedChanged(None));
        }
    }

    /// Uploads the staged candidate and prepends the backend's record.
    ///
    /// The `uploading` flag is advisory; concurrent calls are not serialized.
    pub async fn upload_staged(&self) -> Result<ImageRecord, GalleryError> {
        let staged = {
            let mut guard = self.inner.lock().await;
            let Some(staged) = guard.staged.clone() else {
                drop(guard);
                let err = GalleryError::NothingStaged;
                self.notify(Notice::error(err.to_string()));
                return Err(err);
            };
            guard.uploading = true;
            staged
        };
        self.emit(GalleryEvent::UploadingChanged(true));

        let outcome = self.backend.upload_image(&staged).await;

        match outcome {
            Ok(record) => {
                let record = record.completed();
                let (images, cleared) = {
                    let mut guard = self.inner.lock().await;
                    guard.uploading = false;
                    guard.images.retain(|known| known.id != record.id);
                    guard.images.insert(0, record.clone());
                    // A file picked while the request was in flight stays staged.
                    let cleared = guard
                        .staged
                        .as_ref()
                        .is_some_and(|current| Arc::ptr_eq(current, &staged));
                    if cleared {
                        guard.staged = None;
                    }
                    (guard.images.clone(), cleared)
                };
                info!(id = %record.id, file_name = %record.file_name, "gallery: uploaded image");
                self.emit(GalleryEvent::UploadingChanged(false));
                self.emit(GalleryEvent::ImagesChanged(images));
                if cleared {
                    self.emit(GalleryEvent::StagedChanged(None));
                }
                self.notify(Notice::success(UPLOAD_SUCCEEDED));
                Ok(record)
            }
            Err(source) => {
                self.inner.lock().await.uploading = false;
                self.emit(GalleryEvent::UploadingChanged(false));
                let message = source
                    .server_message()
                    .unwrap_or(UPLOAD_FAILED)
                    .to_string();
                Err(self.fail(message, source))
            }
        }
    }

    /// Deletes `id` on the backend, then drops every local record with that id.
    pub async fn delete_image(&self, id: &ImageId) -> Result<usize, GalleryError> {
        if let Err(source) = self.backend.delete_image(id).await {
            return Err(self.fail(DELETE_FAILED, source));
        }

        let (images, removed) = {
            let mut guard = self.inner.lock().await;
            let before = guard.images.len();
            guard.images.retain(|record| &record.id != id);
            let removed = before - guard.images.len();
            (guard.images.clone(), removed)
        };
        info!(%id, removed, "gallery: deleted image");
        self.emit(GalleryEvent::ImagesChanged(images));
        self.notify(Notice::success(DELETE_SUCCEEDED));
        Ok(removed)
    }

    pub fn image_url(&self, record: &ImageRecord) -> String {
        self.backend.stored_file_url(&record.file_name)
    }

    /// Downloads the stored image behind `record`. Failures degrade to `None`
    /// without a notice.
    pub async fn fetch_thumbnail(&self, record: &ImageRecord) -> Option<Vec<u8>> {
        self.fetch_stored_image(&record.file_name).await
    }

    /// Downloads a stored image by its storage-side file name. Works whether
    /// or not the record is in the local collection.
    pub async fn fetch_stored_image(&self, file_name: &str) -> Option<Vec<u8>> {
        match self.backend.fetch_stored_file(file_name).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!(file_name, "gallery: stored image unavailable: {err}");
                None
            }
        }
    }

    fn fail(&self, message: impl Into<String>, source: TransportError) -> GalleryError {
        let message = message.into();
        warn!(error = %source, "gallery: {message}");
        self.notify(Notice::error(message.clone()));
        GalleryError::Backend { message, source }
    }

    fn notify(&self, notice: Notice) {
        self.emit(GalleryEvent::Notice(notice));
    }

    fn emit(&self, event: GalleryEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
