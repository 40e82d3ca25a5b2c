use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Multipart, Path, multipart::MultipartRejection},
    http::{HeaderMap, header},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::errors::{ApiError, ErrorBody};
use crate::storage::Storage;
use crate::upload;

/// Public prefix of the static file route.
pub const STATIC_ROUTE: &str = "/uploads";

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileInfo {
    /// Generated name of the stored file.
    pub name: String,
    /// Where the file can be fetched.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// Validated content type.
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub file: FileInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Multipart body accepted by the upload endpoint.
#[derive(ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// File to upload.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Prefix for file URLs: the configured public URL, or one rebuilt from the
/// request's `Host` and `X-Forwarded-Proto` headers.
fn base_url(config: &AppConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return String::new();
    };
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    format!("{scheme}://{host}")
}

/// URL of a stored file. The name is percent-encoded as a single path segment.
fn file_url(base: &str, name: &str) -> String {
    format!("{base}{STATIC_ROUTE}/{}", urlencoding::encode(name))
}

/// Upload a file.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    request_body(
        content = UploadForm,
        content_type = "multipart/form-data",
        description = "Form with a single `file` part"
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadResponse),
        (status = 400, description = "Missing file, file or request body too large, or type not allowed", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn upload(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let accepted =
        upload::receive_file(&mut multipart, &state.config.upload, state.storage.as_ref()).await?;

    tracing::info!(
        name = %accepted.stored.name,
        size = accepted.stored.size,
        content_type = %accepted.content_type,
        "file uploaded"
    );

    let base = base_url(&state.config, &headers);
    Ok(Json(UploadResponse {
        success: true,
        file: FileInfo {
            url: file_url(&base, &accepted.stored.name),
            name: accepted.stored.name,
            size: accepted.stored.size,
            content_type: accepted.content_type.essence_str().to_string(),
        },
    }))
}

/// List all uploaded files.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "List of files retrieved successfully", body = FileListResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_files(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FileListResponse>, ApiError> {
    let names = state.storage.list().await?;

    let base = base_url(&state.config, &headers);
    let files = names
        .into_iter()
        .map(|name| FileEntry {
            url: file_url(&base, &name),
            name,
        })
        .collect();

    Ok(Json(FileListResponse {
        success: true,
        files,
    }))
}

/// Delete a file by its stored name.
#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Name of the file to delete")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = DeleteResponse),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn delete_file(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.storage.delete(&filename).await?;

    tracing::info!(name = %filename, "file deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("File {filename} deleted successfully"),
    }))
}
