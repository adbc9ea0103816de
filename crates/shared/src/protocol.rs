//! Route layout and form field names of the image-analysis backend.

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "image";

pub fn images_route() -> &'static [&'static str] {
    &["api", "images"]
}

pub fn upload_route() -> &'static [&'static str] {
    &["api", "upload"]
}

/// Segments of `DELETE /api/image/{id}`.
pub fn image_route(id: &str) -> [&str; 3] {
    ["api", "image", id]
}

/// Segments of `GET /api/upload/{file_name}`, used for thumbnails.
pub fn stored_file_route(file_name: &str) -> [&str; 3] {
    ["api", "upload", file_name]
}
