//! HTTP access to the image-analysis backend.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::{ImageId, ImageRecord},
    error::ApiErrorBody,
    protocol::{image_route, images_route, stored_file_route, upload_route, UPLOAD_FIELD},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::candidate::CandidateFile;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("server url must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {status}")]
    Status { status: u16, message: Option<String> },
}

impl TransportError {
    /// Message the backend put in its error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Operations the gallery needs from its backend.
#[async_trait]
pub trait GalleryBackend: Send + Sync {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, TransportError>;
    async fn upload_image(&self, file: &CandidateFile) -> Result<ImageRecord, TransportError>;
    async fn delete_image(&self, id: &ImageId) -> Result<(), TransportError>;
    async fn fetch_stored_file(&self, file_name: &str) -> Result<Vec<u8>, TransportError>;
    fn stored_file_url(&self, file_name: &str) -> String;
}

pub struct HttpGalleryBackend {
    http: Client,
    base: Url,
}

impl HttpGalleryBackend {
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, TransportError> {
        let base = Url::parse(server_url.trim())?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(TransportError::UnsupportedScheme(base.scheme().to_string()));
        }
        Ok(Self { http, base })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Passes 2xx responses through and turns anything else into
/// [`TransportError::Status`], keeping the body's `message` when present.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        message: ApiErrorBody::message_from_bytes(&body),
    })
}

#[async_trait]
impl GalleryBackend for HttpGalleryBackend {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, TransportError> {
        let url = self.endpoint(images_route().iter().copied());
        debug!(%url, "gallery http: list images");
        let response = self.http.get(url).send().await?;
        let records = check_status(response).await?.json().await?;
        Ok(records)
    }

    async fn upload_image(&self, file: &CandidateFile) -> Result<ImageRecord, TransportError> {
        let url = self.endpoint(upload_route().iter().copied());
        debug!(
            %url,
            file_name = %file.file_name,
            size = file.size(),
            "gallery http: upload image"
        );
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type)?;
        }
        let form = Form::new().part(UPLOAD_FIELD, part);
        let response = self.http.post(url).multipart(form).send().await?;
        let record = check_status(response).await?.json().await?;
        Ok(record)
    }

    async fn delete_image(&self, id: &ImageId) -> Result<(), TransportError> {
        let url = self.endpoint(image_route(id.as_str()));
        debug!(%url, "gallery http: delete image");
        let response = self.http.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch_stored_file(&self, file_name: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint(stored_file_route(file_name));
        let response = self.http.get(url).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn stored_file_url(&self, file_name: &str) -> String {
        self.endpoint(stored_file_route(file_name)).to_string()
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
