use super::*;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use shared::domain::ImageStatus;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct ReceivedUpload {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct BackendState {
    listing: serde_json::Value,
    uploads: Vec<ReceivedUpload>,
    deleted: Vec<String>,
    upload_rejection: Option<(StatusCode, String)>,
    files: Vec<(String, Vec<u8>)>,
}

type SharedState = Arc<Mutex<BackendState>>;

async fn handle_list(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(state.lock().await.listing.clone())
}

async fn handle_upload(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let mut guard = state.lock().await;
    if let Some((status, body)) = guard.upload_rejection.clone() {
        return (status, body).into_response();
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        guard.uploads.push(ReceivedUpload {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }

    let Some(upload) = guard.uploads.last().cloned() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    Json(serde_json::json!({
        "id": format!("img-{}", guard.uploads.len()),
        "fileName": format!("stored-{}", upload.file_name.clone().unwrap_or_default()),
        "originalName": upload.file_name,
        "mimeType": upload.content_type,
        "size": upload.bytes.len(),
        "uploadedAt": "2024-03-05T10:15:00Z",
        "description": "a small test image"
    }))
    .into_response()
}

async fn handle_delete(State(state): State<SharedState>, Path(id): Path<String>) -> StatusCode {
    let mut guard = state.lock().await;
    if id == "missing" {
        return StatusCode::NOT_FOUND;
    }
    guard.deleted.push(id);
    StatusCode::OK
}

async fn handle_stored_file(
    State(state): State<SharedState>,
    Path(file_name): Path<String>,
) -> Response {
    let guard = state.lock().await;
    match guard.files.iter().find(|(name, _)| *name == file_name) {
        Some((_, bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend(state: BackendState) -> anyhow::Result<(String, SharedState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/api/images", get(handle_list))
        .route("/api/upload", post(handle_upload))
        .route("/api/upload/:file_name", get(handle_stored_file))
        .route("/api/image/:id", delete(handle_delete))
        .with_state(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn list_images_parses_camel_case_records() {
    let (server_url, _state) = spawn_backend(BackendState {
        listing: serde_json::json!([
            {
                "id": "x",
                "fileName": "stored-x.png",
                "originalName": "cat.png",
                "mimeType": "image/png",
                "size": 2048,
                "uploadedAt": "2024-01-01T00:00:00Z",
                "description": "a cat"
            },
            {
                "id": "y",
                "fileName": "stored-y.jpg",
                "uploadedAt": "2024-01-02T08:30:00.000Z",
                "description": "a dog"
            }
        ]),
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");

    let records = backend.list_images().await.expect("list");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, ImageId::new("x"));
    assert_eq!(records[0].original_name.as_deref(), Some("cat.png"));
    assert_eq!(records[0].mime_type.as_deref(), Some("image/png"));
    assert_eq!(records[0].size, Some(2048));
    assert_eq!(records[0].description, "a cat");
    assert_eq!(records[0].display_name(), "cat.png");
    assert_eq!(records[1].original_name, None);
    assert_eq!(records[1].size, None);
    assert_eq!(records[1].display_name(), "stored-y.jpg");
    assert_eq!(records[1].status, ImageStatus::Completed);
}

#[tokio::test]
async fn list_images_keeps_records_with_offset_less_timestamps() {
    let (server_url, _state) = spawn_backend(BackendState {
        listing: serde_json::json!([
            {
                "id": "a",
                "fileName": "stored-a.png",
                "uploadedAt": "2024-01-01T00:00:00",
                "description": "a cat"
            },
            {
                "id": "b",
                "fileName": "stored-b.png",
                "uploadedAt": "2024-01-01 00:00:00",
                "description": "a dog"
            }
        ]),
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");

    let records = backend.list_images().await.expect("list");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].uploaded_at.as_str(), "2024-01-01T00:00:00");
    assert_eq!(records[1].uploaded_at.as_str(), "2024-01-01 00:00:00");
    assert_eq!(records[0].uploaded_at.to_utc(), records[1].uploaded_at.to_utc());
    assert!(records[1].uploaded_at.to_utc().is_some());
}

#[tokio::test]
async fn upload_sends_file_in_image_multipart_field() {
    let (server_url, state) = spawn_backend(BackendState::default())
        .await
        .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");
    let file = CandidateFile::new("cat.png", Some("image/png".to_string()), b"png-bytes".to_vec());

    let record = backend.upload_image(&file).await.expect("upload");

    assert_eq!(record.id, ImageId::new("img-1"));
    assert_eq!(record.file_name, "stored-cat.png");
    assert_eq!(record.original_name.as_deref(), Some("cat.png"));
    assert_eq!(record.size, Some(9));
    assert_eq!(record.description, "a small test image");

    let guard = state.lock().await;
    assert_eq!(guard.uploads.len(), 1);
    let upload = &guard.uploads[0];
    assert_eq!(upload.field, "image");
    assert_eq!(upload.file_name.as_deref(), Some("cat.png"));
    assert_eq!(upload.content_type.as_deref(), Some("image/png"));
    assert_eq!(upload.bytes, b"png-bytes");
}

#[tokio::test]
async fn upload_rejection_surfaces_server_message() {
    let (server_url, _state) = spawn_backend(BackendState {
        upload_rejection: Some((
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"Image analysis failed"}"#.to_string(),
        )),
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");
    let file = CandidateFile::new("cat.png", Some("image/png".to_string()), b"png".to_vec());

    let err = backend.upload_image(&file).await.expect_err("must fail");

    assert!(matches!(err, TransportError::Status { status: 500, .. }));
    assert_eq!(err.server_message(), Some("Image analysis failed"));
}

#[tokio::test]
async fn upload_rejection_without_json_body_has_no_message() {
    let (server_url, _state) = spawn_backend(BackendState {
        upload_rejection: Some((StatusCode::BAD_GATEWAY, "upstream down".to_string())),
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");
    let file = CandidateFile::new("cat.png", Some("image/png".to_string()), b"png".to_vec());

    let err = backend.upload_image(&file).await.expect_err("must fail");

    assert!(matches!(err, TransportError::Status { status: 502, .. }));
    assert_eq!(err.server_message(), None);
}

#[test]
fn blank_server_message_counts_as_absent() {
    assert_eq!(ApiErrorBody::message_from_bytes(br#"{"message":"   "}"#), None);
    assert_eq!(ApiErrorBody::message_from_bytes(b"{}"), None);
}

#[tokio::test]
async fn delete_targets_percent_encoded_id() {
    let (server_url, state) = spawn_backend(BackendState::default())
        .await
        .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");

    backend
        .delete_image(&ImageId::new("img 7"))
        .await
        .expect("delete");

    assert_eq!(state.lock().await.deleted, vec!["img 7".to_string()]);
}

#[tokio::test]
async fn delete_of_unknown_id_reports_status() {
    let (server_url, _state) = spawn_backend(BackendState::default())
        .await
        .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");

    let err = backend
        .delete_image(&ImageId::new("missing"))
        .await
        .expect_err("must fail");

    assert!(matches!(err, TransportError::Status { status: 404, message: None }));
}

#[tokio::test]
async fn fetches_stored_file_bytes() {
    let (server_url, _state) = spawn_backend(BackendState {
        files: vec![("stored-cat.png".to_string(), b"thumbnail".to_vec())],
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let backend = HttpGalleryBackend::new(&server_url).expect("backend");

    let bytes = backend
        .fetch_stored_file("stored-cat.png")
        .await
        .expect("fetch");
    assert_eq!(bytes, b"thumbnail");

    let err = backend
        .fetch_stored_file("absent.png")
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend = HttpGalleryBackend::new(&format!("http://{addr}")).expect("backend");

    let err = backend.list_images().await.expect_err("must fail");

    assert!(matches!(err, TransportError::Request(_)));
    assert_eq!(err.server_message(), None);
}

#[test]
fn rejects_non_http_server_urls() {
    assert!(matches!(
        HttpGalleryBackend::new("ftp://example.com"),
        Err(TransportError::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
    assert!(matches!(
        HttpGalleryBackend::new("not a url"),
        Err(TransportError::InvalidUrl(_))
    ));
}

#[test]
fn stored_file_url_keeps_base_path_prefix() {
    let backend = HttpGalleryBackend::new("https://gallery.example.com/app/").expect("backend");
    assert_eq!(
        backend.stored_file_url("stored-cat.png"),
        "https://gallery.example.com/app/api/upload/stored-cat.png"
    );

    let backend = HttpGalleryBackend::new("http://127.0.0.1:3000").expect("backend");
    assert_eq!(
        backend.stored_file_url("a b.png"),
        "http://127.0.0.1:3000/api/upload/a%20b.png"
    );
}

#[tokio::test]
async fn controller_round_trip_over_http() {
    let (server_url, state) = spawn_backend(BackendState {
        listing: serde_json::json!([
            {
                "id": "x",
                "fileName": "stored-x.png",
                "uploadedAt": "2024-01-01T00:00:00Z",
                "description": "a cat"
            }
        ]),
        ..BackendState::default()
    })
    .await
    .expect("spawn backend");
    let gallery = crate::GalleryController::connect(&server_url).expect("controller");

    gallery.list_images().await.expect("list");
    gallery
        .select_file(CandidateFile::new(
            "dog.webp",
            Some("image/webp".to_string()),
            b"webp".to_vec(),
        ))
        .await
        .expect("stage");
    let uploaded = gallery.upload_staged().await.expect("upload");
    gallery
        .delete_image(&ImageId::new("x"))
        .await
        .expect("delete");

    let images = gallery.images().await;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0], uploaded);
    assert_eq!(images[0].status, ImageStatus::Completed);
    assert!(gallery.staged().await.is_none());
    assert_eq!(
        gallery.image_url(&images[0]),
        format!("{server_url}/api/upload/stored-dog.webp")
    );

    let guard = state.lock().await;
    assert_eq!(guard.uploads.len(), 1);
    assert_eq!(guard.deleted, vec!["x".to_string()]);
}
